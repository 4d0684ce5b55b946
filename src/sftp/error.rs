//! SFTP browsing and bulk-operation errors

use thiserror::Error;

use super::fs::RemoteError;
use super::types::BulkResult;

#[derive(Debug, Error)]
pub enum SftpError {
    #[error("Path does not exist or is not a directory: {0}")]
    InvalidPath(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file (directories cannot be deleted): {0}")]
    NotAFile(String),

    #[error("Nothing is selected")]
    NoSelection,

    #[error("Remote I/O error: {0}")]
    RemoteIo(String),

    #[error("Connection to the server was lost: {0}")]
    ConnectionLost(String),

    #[error("{} of {} deletions failed", .0.failed.len(), .0.total())]
    PartialBulkFailure(BulkResult),
}

impl SftpError {
    /// Errors after which the session can no longer be used
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, SftpError::ConnectionLost(_))
    }

    /// Map a failure of listing `path`
    pub fn from_listing(err: RemoteError, path: &str) -> Self {
        match err {
            RemoteError::NotFound(_) | RemoteError::NotADirectory(_) => {
                SftpError::InvalidPath(path.to_string())
            }
            RemoteError::ConnectionLost(msg) => SftpError::ConnectionLost(msg),
            other => SftpError::RemoteIo(other.to_string()),
        }
    }
}

impl From<RemoteError> for SftpError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::ConnectionLost(msg) => SftpError::ConnectionLost(msg),
            other => SftpError::RemoteIo(other.to_string()),
        }
    }
}

impl serde::Serialize for SftpError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
