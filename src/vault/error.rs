//! Error types for credential vault operations

use thiserror::Error;

use super::profile::ProfileError;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Encryption key could not be read or written: {0}")]
    KeyIo(std::io::Error),

    #[error("Server details could not be written: {0}")]
    VaultWrite(std::io::Error),

    #[error("Server details could not be read: {0}")]
    VaultRead(std::io::Error),

    #[error("No saved server details found")]
    NotFound,

    /// Carries no detail. Nothing derived from the ciphertext or key may
    /// reach a message or log line.
    #[error("Saved server details could not be decrypted (wrong key or corrupted data)")]
    Crypto,

    #[error("Saved server details are invalid: {0}")]
    InvalidProfile(#[from] ProfileError),
}

impl serde::Serialize for VaultError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
