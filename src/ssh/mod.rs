//! SSH Module
//!
//! russh transport: connect, authenticate with a password, open SFTP.

mod client;
mod error;

pub use client::{fingerprint, ClientHandler, ConnectSettings, SshConnector};
pub use error::SessionError;
