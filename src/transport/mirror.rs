//! Local directory tree laid out like the clearinghouse server (a synced or mounted copy).
//! Remote paths resolve segment by segment, falling back to a case-insensitive
//! match because the server treats names case-insensitively.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Connector, Transport};
use crate::error::{AsicError, AsicResult};

#[derive(Debug, Clone)]
pub struct MirrorConnector {
    root: PathBuf,
}

impl MirrorConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }
}

impl Connector for MirrorConnector {
    type Session = MirrorSession;

    fn connect_and_authenticate(&self) -> AsicResult<MirrorSession> {
        if !self.root.is_dir() {
            return Err(AsicError::Transfer { path: self.root.display().to_string(), message: "mirror root is not a directory".into() });
        }
        Ok(MirrorSession { root: self.root.clone() })
    }

    fn describe(&self) -> String { format!("mirror:{}", self.root.display()) }
}

#[derive(Debug)]
pub struct MirrorSession {
    root: PathBuf,
}

impl MirrorSession {
    /// Map a remote path below the root. Empty, `.` and `..` segments are dropped so a
    /// remote path can never escape the root.
    pub fn resolve(&self, remote: &str) -> Option<PathBuf> {
        let mut cur = self.root.clone();
        for seg in remote.split(['/', '\\']).filter(|s| !s.is_empty() && *s != "." && *s != "..") {
            let exact = cur.join(seg);
            if exact.exists() {
                cur = exact;
                continue;
            }
            let found = fs::read_dir(&cur).ok()?.flatten().find(|e| e.file_name().to_string_lossy().eq_ignore_ascii_case(seg))?;
            cur = found.path();
        }
        Some(cur)
    }
}

impl Transport for MirrorSession {
    fn list_directory(&mut self, literal_path: &str) -> AsicResult<Vec<String>> {
        let dir = match self.resolve(literal_path) {
            Some(d) if d.is_dir() => d,
            _ => return Err(AsicError::NotFound { path: literal_path.to_string() }),
        };
        let rd = fs::read_dir(&dir).map_err(|e| AsicError::Transfer { path: literal_path.to_string(), message: e.to_string() })?;
        let base = literal_path.trim_end_matches('/');
        let mut out: Vec<String> = rd
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| format!("{}/{}", base, e.file_name().to_string_lossy()))
            .collect();
        out.sort();
        debug!(target: "asic::transport", "listed {} entries in {}", out.len(), literal_path);
        Ok(out)
    }

    fn retrieve_to_local(&mut self, remote_path: &str, local_path: &Path) -> AsicResult<()> {
        let src = match self.resolve(remote_path) {
            Some(p) if p.is_file() => p,
            _ => return Err(AsicError::NotFound { path: remote_path.to_string() }),
        };
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).map_err(|e| AsicError::io(parent.display().to_string(), e))?;
        }
        fs::copy(&src, local_path).map_err(|e| AsicError::Transfer { path: remote_path.to_string(), message: e.to_string() })?;
        Ok(())
    }
}
