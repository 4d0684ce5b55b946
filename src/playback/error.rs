//! Playback error types

use std::path::PathBuf;

use thiserror::Error;

use super::engine::EngineError;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Remote I/O error while staging: {0}")]
    RemoteIo(String),

    #[error("Connection lost while staging: {0}")]
    ConnectionLost(String),

    #[error("Local file error on {path:?}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A playback session is already active")]
    AlreadyActive,

    #[error("No matching playback session is active")]
    NoActivePlayback,

    #[error("No embedded audio engine is available")]
    EngineUnavailable,

    #[error("Audio engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to launch external player: {0}")]
    ExternalLaunch(String),

    #[error("Staging was cancelled")]
    Cancelled,
}

impl PlaybackError {
    pub fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlaybackError::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, PlaybackError::ConnectionLost(_))
    }
}

impl serde::Serialize for PlaybackError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
