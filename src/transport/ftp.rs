//! Explicit-TLS FTP session against the clearinghouse server.
//! Directories are listed with `CWD` + `NLST`, so entries come back as bare names.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};
use suppaftp::types::{FileType, FtpError};
use suppaftp::{RustlsConnector, RustlsFtpStream, Status};
use tracing::{debug, info};

use super::{Connector, Transport};
use crate::error::{AsicError, AsicResult};

pub const DEFAULT_PORT: u16 = 21;

/// Host and credentials; a fresh session is opened on every connect.
#[derive(Clone)]
pub struct FtpConnector {
    host: String,
    port: u16,
    user: String,
    secret: String,
}

impl FtpConnector {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { host: host.into(), port, user: user.into(), secret: secret.into() }
    }

    fn tls(&self) -> AsicResult<RustlsConnector> {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| AsicError::Transfer { path: self.describe(), message: e.to_string() })?
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(RustlsConnector::from(Arc::new(config)))
    }
}

impl fmt::Debug for FtpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("secret", &"***")
            .finish()
    }
}

impl Connector for FtpConnector {
    type Session = FtpSession;

    fn connect_and_authenticate(&self) -> AsicResult<FtpSession> {
        let target = self.describe();
        let plain = RustlsFtpStream::connect((self.host.as_str(), self.port)).map_err(|e| ftp_error(&target, e))?;
        let mut stream = plain.into_secure(self.tls()?, &self.host).map_err(|e| ftp_error(&target, e))?;
        info!(target: "asic::transport", "login to {} as {}", self.host, self.user);
        stream.login(&self.user, &self.secret).map_err(|e| ftp_error(&target, e))?;
        stream.transfer_type(FileType::Binary).map_err(|e| ftp_error(&target, e))?;
        Ok(FtpSession { stream })
    }

    fn describe(&self) -> String { format!("ftps://{}@{}:{}", self.user, self.host, self.port) }
}

pub struct FtpSession {
    stream: RustlsFtpStream,
}

impl Transport for FtpSession {
    fn list_directory(&mut self, literal_path: &str) -> AsicResult<Vec<String>> {
        self.stream.cwd(literal_path).map_err(|e| ftp_error(literal_path, e))?;
        let names = self.stream.nlst(None).map_err(|e| ftp_error(literal_path, e))?;
        debug!(target: "asic::transport", "{} entries in {}", names.len(), literal_path);
        Ok(names)
    }

    fn retrieve_to_local(&mut self, remote_path: &str, local_path: &Path) -> AsicResult<()> {
        let buf = self.stream.retr_as_buffer(remote_path).map_err(|e| ftp_error(remote_path, e))?;
        std::fs::write(local_path, buf.into_inner()).map_err(|e| AsicError::io(local_path.display().to_string(), e))
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        let _ = self.stream.quit();
    }
}

/// `550` (no such file or directory) is `NotFound`; every other failure is a `Transfer`
/// error, which the reconnecting session retries once.
pub fn ftp_error(path: &str, err: FtpError) -> AsicError {
    match err {
        FtpError::UnexpectedResponse(ref resp) if matches!(resp.status, Status::FileUnavailable) => {
            AsicError::NotFound { path: path.to_string() }
        }
        other => AsicError::Transfer { path: path.to_string(), message: other.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::net::TcpListener;
    use suppaftp::types::Response;

    #[test]
    fn missing_directory_is_not_found() {
        let err = FtpError::UnexpectedResponse(Response::new(Status::FileUnavailable, b"550 No such directory".to_vec()));
        let mapped = ftp_error("/PUBLICOK/SIC/COMERCIA/2023-09/", err);
        assert!(matches!(mapped, AsicError::NotFound { ref path } if path == "/PUBLICOK/SIC/COMERCIA/2023-09/"));
    }

    #[test]
    fn other_failures_are_retryable_transfers() {
        let reset = FtpError::ConnectionError(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
        assert!(matches!(ftp_error("/x", reset), AsicError::Transfer { .. }));
        let denied = FtpError::UnexpectedResponse(Response::new(Status::NotLoggedIn, b"530 Login incorrect".to_vec()));
        assert!(matches!(ftp_error("/x", denied), AsicError::Transfer { .. }));
        assert!(matches!(ftp_error("/x", FtpError::BadResponse), AsicError::Transfer { .. }));
    }

    #[test]
    fn refused_connection_is_a_transfer_error() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let connector = FtpConnector::new("127.0.0.1", port, "asic", "secret");
        let err = connector.connect_and_authenticate().err().unwrap();
        assert!(matches!(err, AsicError::Transfer { .. }), "{err:?}");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn secret_is_never_shown() {
        let connector = FtpConnector::new("ftp.example.co", DEFAULT_PORT, "isamdnt", "hunter2");
        assert_eq!(connector.describe(), "ftps://isamdnt@ftp.example.co:21");
        assert!(!format!("{connector:?}").contains("hunter2"));
    }
}
