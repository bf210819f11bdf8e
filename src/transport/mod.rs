//! Transport boundary: how the engine lists and fetches remote files.
//! The engine never talks to a file-transfer client directly; it goes through
//! [`Connector`]/[`Transport`] and the one-retry wrapper [`ReconnectingSession`].

use std::path::Path;

use tracing::{info, warn};

use crate::error::{AsicError, AsicResult};

pub mod ftp;
pub mod mirror;

pub use ftp::{FtpConnector, FtpSession};
pub use mirror::{MirrorConnector, MirrorSession};

/// An authenticated session.
pub trait Transport {
    /// Entries of one literal remote directory. Entries may be bare names or full paths.
    fn list_directory(&mut self, literal_path: &str) -> AsicResult<Vec<String>>;
    fn retrieve_to_local(&mut self, remote_path: &str, local_path: &Path) -> AsicResult<()>;
}

/// Opens sessions; must be callable again after a session dies.
pub trait Connector {
    type Session: Transport;
    fn connect_and_authenticate(&self) -> AsicResult<Self::Session>;
    fn describe(&self) -> String;
}

/// Lazily connected session that reconnects and retries once on a transfer failure.
/// A second consecutive failure is returned to the caller.
pub struct ReconnectingSession<C: Connector> {
    connector: C,
    session: Option<C::Session>,
    connects: usize,
}

impl<C: Connector> ReconnectingSession<C> {
    pub fn new(connector: C) -> Self { Self { connector, session: None, connects: 0 } }

    /// Number of successful connects so far.
    pub fn connects(&self) -> usize { self.connects }

    fn session(&mut self) -> AsicResult<&mut C::Session> {
        if self.session.is_none() {
            let s = self.connector.connect_and_authenticate()?;
            self.connects += 1;
            info!(target: "asic::transport", "connected to {}", self.connector.describe());
            self.session = Some(s);
        }
        self.session.as_mut().ok_or_else(|| AsicError::Transfer { path: self.connector.describe(), message: "no session".into() })
    }

    fn with_retry<T>(&mut self, what: &str, mut op: impl FnMut(&mut C::Session) -> AsicResult<T>) -> AsicResult<T> {
        match op(self.session()?) {
            Err(AsicError::Transfer { path, message }) => {
                warn!(target: "asic::transport", "{} of {} failed ({}); reconnecting", what, path, message);
                self.session = None;
                op(self.session()?)
            }
            other => other,
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn list_directory(&mut self, literal_path: &str) -> AsicResult<Vec<String>> { (**self).list_directory(literal_path) }

    fn retrieve_to_local(&mut self, remote_path: &str, local_path: &Path) -> AsicResult<()> {
        (**self).retrieve_to_local(remote_path, local_path)
    }
}

impl<C: Connector> Transport for ReconnectingSession<C> {
    fn list_directory(&mut self, literal_path: &str) -> AsicResult<Vec<String>> {
        self.with_retry("listing", |s| s.list_directory(literal_path))
    }

    fn retrieve_to_local(&mut self, remote_path: &str, local_path: &Path) -> AsicResult<()> {
        self.with_retry("retrieval", |s| s.retrieve_to_local(remote_path, local_path))
    }
}
