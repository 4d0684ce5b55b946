//! Credential Vault Module
//!
//! Persists a single server profile encrypted at rest with ChaCha20-Poly1305.
//! The symmetric key is generated once and stored in its own file.

pub mod crypto;
mod error;
mod profile;
mod store;

pub use error::VaultError;
pub use profile::{parse_port, ProfileError, ServerProfile};
pub use store::CredentialVault;
