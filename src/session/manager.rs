//! Session Manager
//!
//! Owns the one remote session the process may hold. Dependent operations
//! borrow it through [`SessionManager::remote`] for the length of a single
//! call; nothing else keeps a reference across a disconnect.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::state::SessionState;
use crate::cancel::CancelToken;
use crate::sftp::{RemoteConnector, RemoteFs};
use crate::ssh::SessionError;
use crate::vault::ServerProfile;

/// Identifies one live connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionHandle {
    pub id: Uuid,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub connected_at: DateTime<Utc>,
}

struct ActiveSession {
    handle: SessionHandle,
    fs: Box<dyn RemoteFs>,
}

pub struct SessionManager {
    connector: Arc<dyn RemoteConnector>,
    active: Option<ActiveSession>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            connector,
            active: None,
            state_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Receive every state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn handle(&self) -> Option<&SessionHandle> {
        self.active.as_ref().map(|a| &a.handle)
    }

    /// Borrow the connected session for one operation
    pub fn remote(&self) -> Result<&dyn RemoteFs, SessionError> {
        self.active
            .as_ref()
            .map(|a| a.fs.as_ref())
            .ok_or(SessionError::NotConnected)
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    /// Open a session for `profile`, closing any previous one first.
    ///
    /// Cancelling `cancel` abandons the attempt and leaves the manager
    /// `Disconnected`.
    pub async fn connect(
        &mut self,
        profile: &ServerProfile,
        cancel: &CancelToken,
    ) -> Result<SessionHandle, SessionError> {
        profile.validate()?;

        self.disconnect().await;
        self.set_state(SessionState::Connecting);
        info!("Connecting to {} as {}", profile.address(), profile.username);

        let connector = Arc::clone(&self.connector);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            result = connector.connect(profile) => result,
        };

        match result {
            Ok(fs) => {
                let handle = SessionHandle {
                    id: Uuid::new_v4(),
                    host: profile.host.clone(),
                    port: profile.port,
                    username: profile.username.clone(),
                    connected_at: Utc::now(),
                };
                info!("Connected to {} (session {})", profile.address(), handle.id);
                self.active = Some(ActiveSession {
                    handle: handle.clone(),
                    fs,
                });
                self.set_state(SessionState::Connected);
                Ok(handle)
            }
            Err(SessionError::Cancelled) => {
                info!("Connect to {} cancelled", profile.address());
                self.set_state(SessionState::Disconnected);
                Err(SessionError::Cancelled)
            }
            Err(e) => {
                error!("Connect to {} failed: {}", profile.address(), e);
                self.set_state(SessionState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Close the session. Returns whether there was one to close.
    pub async fn disconnect(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            if !matches!(self.state(), SessionState::Disconnected) {
                self.set_state(SessionState::Disconnected);
            }
            return false;
        };

        active.fs.close().await;
        info!(
            "Disconnected from {}:{} (session {})",
            active.handle.host, active.handle.port, active.handle.id
        );
        self.set_state(SessionState::Disconnected);
        true
    }

    /// Drop a session whose transport has failed underneath it
    pub async fn connection_lost(&mut self, reason: &str) {
        if let Some(active) = self.active.take() {
            warn!(
                "Connection to {}:{} lost: {}",
                active.handle.host, active.handle.port, reason
            );
            active.fs.close().await;
        }
        self.set_state(SessionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sftp::testing::{ConnectBehavior, MemoryConnector, MemoryFs};
    use crate::vault::ProfileError;

    fn profile() -> ServerProfile {
        ServerProfile::new("10.0.0.5", 22, "bob", "s3cret")
    }

    fn manager(fs: MemoryFs) -> (SessionManager, Arc<MemoryConnector>) {
        let connector = Arc::new(MemoryConnector::new(fs));
        (SessionManager::new(connector.clone()), connector)
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let fs = MemoryFs::new().file("/song.mp3", b"");
        let (mut manager, _) = manager(fs.clone());
        assert_eq!(manager.state(), SessionState::Disconnected);
        assert!(matches!(manager.remote(), Err(SessionError::NotConnected)));

        let handle = manager.connect(&profile(), &CancelToken::new()).await.unwrap();
        assert_eq!(handle.host, "10.0.0.5");
        assert_eq!(handle.username, "bob");
        assert_eq!(manager.state(), SessionState::Connected);
        assert_eq!(manager.handle(), Some(&handle));

        let entries = manager.remote().unwrap().list_directory("/").await.unwrap();
        assert_eq!(entries.len(), 1);

        assert!(manager.disconnect().await);
        assert_eq!(manager.state(), SessionState::Disconnected);
        assert!(fs.is_closed());
        assert!(manager.remote().is_err());

        // second disconnect is a no-op
        assert!(!manager.disconnect().await);
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let (mut manager, connector) = manager(MemoryFs::new());

        connector.set_behavior(ConnectBehavior::RejectCredentials);
        let err = manager.connect(&profile(), &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert!(matches!(manager.state(), SessionState::Failed(_)));
        assert!(manager.handle().is_none());

        connector.set_behavior(ConnectBehavior::Unreachable);
        let err = manager.connect(&profile(), &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::Network(_)));
        assert!(matches!(manager.state(), SessionState::Failed(_)));

        // an explicit connect recovers from Failed
        connector.set_behavior(ConnectBehavior::Accept);
        manager.connect(&profile(), &CancelToken::new()).await.unwrap();
        assert!(manager.state().is_connected());
    }

    #[tokio::test]
    async fn test_invalid_profile_rejected_before_network() {
        let (mut manager, connector) = manager(MemoryFs::new());
        let bad = ServerProfile::new("10.0.0.5", 22, "bob", "");

        let err = manager.connect(&bad, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidProfile(ProfileError::MissingField(_))
        ));
        assert_eq!(connector.attempts(), 0);
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_cancelled_connect_ends_disconnected() {
        let (mut manager, connector) = manager(MemoryFs::new());
        connector.set_behavior(ConnectBehavior::Hang);
        let mut states = manager.subscribe();

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            manager.connect(&profile(), &cancel),
        )
        .await
        .expect("connect must not hang once cancelled");

        assert!(matches!(result, Err(SessionError::Cancelled)));
        assert_eq!(manager.state(), SessionState::Disconnected);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_session() {
        let fs = MemoryFs::new();
        let (mut manager, _) = manager(fs.clone());

        let first = manager.connect(&profile(), &CancelToken::new()).await.unwrap();
        let second = manager.connect(&profile(), &CancelToken::new()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(fs.count_calls("close"), 1);
        assert!(manager.state().is_connected());
    }

    #[tokio::test]
    async fn test_connection_lost() {
        let fs = MemoryFs::new();
        let (mut manager, _) = manager(fs.clone());
        manager.connect(&profile(), &CancelToken::new()).await.unwrap();

        manager.connection_lost("broken pipe").await;
        assert_eq!(manager.state(), SessionState::Disconnected);
        assert!(manager.handle().is_none());
        assert!(fs.is_closed());
    }
}
