//! Worker error type

use thiserror::Error;

use crate::playback::PlaybackError;
use crate::sftp::SftpError;
use crate::ssh::SessionError;
use crate::vault::VaultError;

/// Any failure a worker request can report
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Sftp(#[from] SftpError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Background worker has stopped")]
    WorkerGone,
}

impl WorkerError {
    /// Whether the remote session died while serving the request
    pub fn is_connection_lost(&self) -> bool {
        match self {
            WorkerError::Sftp(e) => e.is_connection_lost(),
            WorkerError::Playback(e) => e.is_connection_lost(),
            _ => false,
        }
    }
}

impl serde::Serialize for WorkerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
