//! SSH connector using russh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use russh::client;
use russh::keys::{PublicKey, PublicKeyBase64};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::error::SessionError;
use crate::config::AppConfig;
use crate::sftp::{RemoteConnector, RemoteFs, SftpSession};
use crate::vault::ServerProfile;

/// Timeouts applied to every connect
#[derive(Debug, Clone, Copy)]
pub struct ConnectSettings {
    pub timeout: Duration,
    pub keepalive_interval: Duration,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

impl From<&AppConfig> for ConnectSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: config.connect_timeout(),
            keepalive_interval: config.keepalive_interval(),
        }
    }
}

/// Opens password-authenticated SFTP sessions
pub struct SshConnector {
    settings: ConnectSettings,
}

impl SshConnector {
    pub fn new(settings: ConnectSettings) -> Self {
        Self { settings }
    }

    async fn open_handle(
        &self,
        profile: &ServerProfile,
    ) -> Result<client::Handle<ClientHandler>, SessionError> {
        let addr = profile.address();
        info!("Connecting to SSH server at {}", addr);

        let socket_addr = tokio::net::lookup_host((profile.host.as_str(), profile.port))
            .await
            .map_err(|e| SessionError::Network(format!("Failed to resolve {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| SessionError::Network(format!("No address found for {}", addr)))?;

        let ssh_config = client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(self.settings.keepalive_interval),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = ClientHandler::new(profile.host.clone(), profile.port);

        let handle = client::connect(Arc::new(ssh_config), socket_addr, handler)
            .await
            .map_err(|e| SessionError::Network(format!("{}: {}", addr, e)))?;

        debug!("SSH handshake completed");
        Ok(handle)
    }
}

#[async_trait]
impl RemoteConnector for SshConnector {
    async fn connect(&self, profile: &ServerProfile) -> Result<Box<dyn RemoteFs>, SessionError> {
        let attempt = async {
            let mut handle = self.open_handle(profile).await?;

            let authenticated = handle
                .authenticate_password(&profile.username, profile.secret.as_str())
                .await
                .map_err(|e| SessionError::Network(e.to_string()))?;

            if !authenticated.success() {
                return Err(SessionError::Authentication(format!(
                    "server rejected credentials for {}",
                    profile.username
                )));
            }
            info!("SSH authentication successful");

            let session = SftpSession::open(handle).await?;
            Ok::<_, SessionError>(Box::new(session) as Box<dyn RemoteFs>)
        };

        tokio::time::timeout(self.settings.timeout, attempt)
            .await
            .map_err(|_| {
                SessionError::Network(format!(
                    "Connection to {} timed out after {}s",
                    profile.address(),
                    self.settings.timeout.as_secs()
                ))
            })?
    }
}

/// SHA256 fingerprint of a host key, in OpenSSH's unpadded base64 form
pub fn fingerprint(key: &PublicKey) -> String {
    let key_bytes = key.public_key_bytes();
    let mut hasher = Sha256::new();
    hasher.update(&key_bytes);
    let hash = hasher.finalize();
    format!("SHA256:{}", BASE64.encode(hash).trim_end_matches('='))
}

/// Client handler for russh callbacks.
///
/// Accepts every host key and logs its fingerprint; there is no known-hosts
/// policy at this layer.
pub struct ClientHandler {
    host: String,
    port: u16,
}

impl ClientHandler {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

impl client::Handler for ClientHandler {
    type Error = SessionError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        info!(
            "Accepting host key for {}:{} (fingerprint: {})",
            self.host,
            self.port,
            fingerprint(server_public_key)
        );
        Ok(true)
    }
}
