//! Remote file-system seam
//!
//! [`RemoteFs`] is everything the browser, bulk operator and playback cache
//! need from a connected session. [`RemoteConnector`] opens one. The russh
//! implementation lives in [`super::session`] and [`crate::ssh`]; tests use the
//! in-memory tree from `sftp::testing`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::ssh::SessionError;
use crate::vault::ServerProfile;

/// A child as reported by the server's directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDirEntry {
    pub name: String,
    /// Classification supplied by the protocol client; never derived from
    /// `raw_mode` here.
    pub is_directory: bool,
    pub raw_mode: u32,
}

/// Failures reported by a [`RemoteFs`]
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Local file error on {path:?}: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Io(String),
}

/// Operations against one live remote session.
///
/// Implementations are not required to support concurrent calls; the worker
/// issues one at a time.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Direct children of `path`, in server order. `.` and `..` are omitted.
    async fn list_directory(&self, path: &str) -> Result<Vec<RawDirEntry>, RemoteError>;

    /// Whether `path` names a directory
    async fn is_directory(&self, path: &str) -> Result<bool, RemoteError>;

    /// Remove a single file
    async fn remove(&self, path: &str) -> Result<(), RemoteError>;

    /// Copy `remote_path` into `local_path`, returning the bytes written
    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError>;

    /// Release the session; later calls may fail with `ConnectionLost`
    async fn close(&self);
}

/// Opens authenticated sessions
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, profile: &ServerProfile) -> Result<Box<dyn RemoteFs>, SessionError>;
}
