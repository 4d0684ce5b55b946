//! Session error types

use thiserror::Error;

use crate::vault::ProfileError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("SSH protocol error: {0}")]
    Protocol(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Connect attempt was cancelled")]
    Cancelled,

    #[error("Invalid server profile: {0}")]
    InvalidProfile(#[from] ProfileError),
}

impl From<russh::Error> for SessionError {
    fn from(err: russh::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}

impl serde::Serialize for SessionError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
