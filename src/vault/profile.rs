//! Server profile: everything needed to open a remote session

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

/// Profile validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid port '{0}': expected a number between 1 and 65535")]
    InvalidPort(String),
}

/// Connection details for one remote host
///
/// Serialized field names are fixed (`server_ip`, `server_port`, `username`,
/// `password`) so existing vault blobs stay readable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    #[serde(rename = "server_ip")]
    pub host: String,

    #[serde(rename = "server_port", deserialize_with = "deserialize_port")]
    pub port: u16,

    pub username: String,

    #[serde(rename = "password")]
    pub secret: String,
}

impl ServerProfile {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Build a profile from raw form input, parsing the port text.
    pub fn from_input(
        host: &str,
        port: &str,
        username: &str,
        secret: &str,
    ) -> Result<Self, ProfileError> {
        let profile = Self::new(host.trim(), parse_port(port)?, username.trim(), secret);
        profile.validate()?;
        Ok(profile)
    }

    /// All fields are required to connect.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.host.trim().is_empty() {
            return Err(ProfileError::MissingField("host"));
        }
        if self.port == 0 {
            return Err(ProfileError::InvalidPort("0".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(ProfileError::MissingField("username"));
        }
        if self.secret.is_empty() {
            return Err(ProfileError::MissingField("secret"));
        }
        Ok(())
    }

    /// `host:port` for logs and socket resolution
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Drop for ServerProfile {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// Parse a port from user text; 1-65535 only.
pub fn parse_port(text: &str) -> Result<u16, ProfileError> {
    match text.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ProfileError::InvalidPort(text.to_string())),
    }
}

/// Older blobs store the port as a string; accept both.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u64),
        Text(String),
    }

    match PortRepr::deserialize(deserializer)? {
        PortRepr::Number(n) => u16::try_from(n)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| serde::de::Error::custom(format!("port out of range: {}", n))),
        PortRepr::Text(s) => parse_port(&s).map_err(serde::de::Error::custom),
    }
}
