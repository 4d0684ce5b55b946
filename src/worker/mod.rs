//! Background worker
//!
//! One tokio task owns the vault, the session manager, the browser and the
//! playback cache, and serves requests strictly one at a time. Callers talk
//! to it through a cloneable [`WorkerController`]; replies come back over
//! oneshot channels so the caller never blocks on remote I/O.

mod command;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};

pub use command::{Connected, NavigationSnapshot, Reply, WorkerCommand};
pub use error::WorkerError;

use crate::cancel::CancelToken;
use crate::config::AppConfig;
use crate::playback::{PlaybackCache, PlaybackId, PlaybackSession};
use crate::session::{SessionManager, SessionState};
use crate::sftp::{
    self, Activation, BulkResult, ListingRow, ParentOutcome, RecursiveListing, RemoteBrowser,
    RemoteConnector,
};
use crate::vault::{CredentialVault, ServerProfile};

const COMMAND_QUEUE: usize = 64;

/// Handle for sending requests to the worker
#[derive(Clone)]
pub struct WorkerController {
    cmd_tx: mpsc::Sender<WorkerCommand>,
    state_rx: watch::Receiver<SessionState>,
}

impl WorkerController {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> WorkerCommand,
    ) -> Result<T, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| WorkerError::WorkerGone)?;
        reply_rx.await.map_err(|_| WorkerError::WorkerGone)?
    }

    pub async fn save_profile(&self, profile: ServerProfile) -> Result<(), WorkerError> {
        self.request(|reply_tx| WorkerCommand::SaveProfile { profile, reply_tx })
            .await
    }

    pub async fn load_profile(&self) -> Result<ServerProfile, WorkerError> {
        self.request(|reply_tx| WorkerCommand::LoadProfile { reply_tx })
            .await
    }

    pub async fn delete_profile(&self) -> Result<(), WorkerError> {
        self.request(|reply_tx| WorkerCommand::DeleteProfile { reply_tx })
            .await
    }

    /// Connect and list the configured initial path. Cancel through `cancel`.
    pub async fn connect(
        &self,
        profile: ServerProfile,
        cancel: CancelToken,
    ) -> Result<Connected, WorkerError> {
        self.request(|reply_tx| WorkerCommand::Connect {
            profile,
            cancel,
            reply_tx,
        })
        .await
    }

    /// Connect with the saved profile, if there is one
    pub async fn auto_login(&self, cancel: CancelToken) -> Result<Option<Connected>, WorkerError> {
        self.request(|reply_tx| WorkerCommand::AutoLogin { cancel, reply_tx })
            .await
    }

    pub async fn disconnect(&self) -> Result<bool, WorkerError> {
        self.request(|reply_tx| WorkerCommand::Disconnect { reply_tx })
            .await
    }

    /// Current session state, answered without waiting for the worker
    pub fn session_state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub async fn list(&self, path: impl Into<String>) -> Result<NavigationSnapshot, WorkerError> {
        let path = path.into();
        self.request(|reply_tx| WorkerCommand::List { path, reply_tx })
            .await
    }

    pub async fn navigate_into(&self, name: impl Into<String>) -> Result<NavigationSnapshot, WorkerError> {
        let name = name.into();
        self.request(|reply_tx| WorkerCommand::NavigateInto { name, reply_tx })
            .await
    }

    pub async fn navigate_parent(&self) -> Result<ParentOutcome, WorkerError> {
        self.request(|reply_tx| WorkerCommand::NavigateParent { reply_tx })
            .await
    }

    pub async fn select(&self, index: usize) -> Result<Option<ListingRow>, WorkerError> {
        self.request(|reply_tx| WorkerCommand::Select { index, reply_tx })
            .await
    }

    pub async fn activate(&self, index: usize) -> Result<Activation, WorkerError> {
        self.request(|reply_tx| WorkerCommand::Activate { index, reply_tx })
            .await
    }

    pub async fn delete_selected(&self) -> Result<String, WorkerError> {
        self.request(|reply_tx| WorkerCommand::DeleteSelected { reply_tx })
            .await
    }

    pub async fn navigation(&self) -> Result<NavigationSnapshot, WorkerError> {
        self.request(|reply_tx| WorkerCommand::Navigation { reply_tx })
            .await
    }

    pub async fn list_recursive(&self, path: Option<String>) -> Result<RecursiveListing, WorkerError> {
        self.request(|reply_tx| WorkerCommand::ListRecursive { path, reply_tx })
            .await
    }

    /// Fails with `PartialBulkFailure` carrying the full partition when any
    /// path could not be deleted
    pub async fn delete_many(&self, paths: Vec<String>) -> Result<BulkResult, WorkerError> {
        self.request(|reply_tx| WorkerCommand::DeleteMany { paths, reply_tx })
            .await
    }

    pub async fn stage(
        &self,
        remote_path: impl Into<String>,
        cancel: CancelToken,
    ) -> Result<PathBuf, WorkerError> {
        let remote_path = remote_path.into();
        self.request(|reply_tx| WorkerCommand::Stage {
            remote_path,
            cancel,
            reply_tx,
        })
        .await
    }

    pub async fn start_embedded(&self, local_path: PathBuf) -> Result<PlaybackSession, WorkerError> {
        self.request(|reply_tx| WorkerCommand::StartEmbedded {
            local_path,
            reply_tx,
        })
        .await
    }

    pub async fn seek(&self, id: PlaybackId, position_secs: f64) -> Result<PlaybackSession, WorkerError> {
        self.request(|reply_tx| WorkerCommand::Seek {
            id,
            position_secs,
            reply_tx,
        })
        .await
    }

    pub async fn poll_position(&self, id: PlaybackId) -> Result<Option<f64>, WorkerError> {
        self.request(|reply_tx| WorkerCommand::PollPosition { id, reply_tx })
            .await
    }

    pub async fn switch_to_external(&self, id: PlaybackId) -> Result<PlaybackSession, WorkerError> {
        self.request(|reply_tx| WorkerCommand::SwitchToExternal { id, reply_tx })
            .await
    }

    pub async fn play_external(&self, local_path: PathBuf) -> Result<(), WorkerError> {
        self.request(|reply_tx| WorkerCommand::PlayExternal {
            local_path,
            reply_tx,
        })
        .await
    }

    pub async fn stop(&self, id: PlaybackId) -> Result<(), WorkerError> {
        self.request(|reply_tx| WorkerCommand::Stop { id, reply_tx })
            .await
    }

    pub async fn set_staging_dir(&self, dir: PathBuf) -> Result<(), WorkerError> {
        self.request(|reply_tx| WorkerCommand::SetStagingDir { dir, reply_tx })
            .await
    }

    /// Stop playback, close the session and end the worker task
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(WorkerCommand::Shutdown { reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }
}

struct Worker {
    vault: CredentialVault,
    sessions: SessionManager,
    browser: RemoteBrowser,
    cache: PlaybackCache,
    config: AppConfig,
}

/// Spawn the worker task
pub fn spawn_worker(
    connector: Arc<dyn RemoteConnector>,
    vault: CredentialVault,
    cache: PlaybackCache,
    config: AppConfig,
) -> WorkerController {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<WorkerCommand>(COMMAND_QUEUE);
    let sessions = SessionManager::new(connector);
    let state_rx = sessions.subscribe();

    let mut worker = Worker {
        vault,
        sessions,
        browser: RemoteBrowser::new(&config.initial_path),
        cache,
        config,
    };

    tokio::spawn(async move {
        info!("Worker task started");

        while let Some(cmd) = cmd_rx.recv().await {
            if let WorkerCommand::Shutdown { reply_tx } = cmd {
                worker.shutdown().await;
                let _ = reply_tx.send(());
                break;
            }
            worker.dispatch(cmd).await;
        }

        // Controllers dropped without a shutdown
        worker.shutdown().await;
        info!("Worker task terminated");
    });

    WorkerController { cmd_tx, state_rx }
}

fn respond<T>(reply_tx: Reply<T>, result: Result<T, WorkerError>) {
    if reply_tx.send(result).is_err() {
        warn!("Caller dropped before receiving worker reply");
    }
}

impl Worker {
    async fn dispatch(&mut self, cmd: WorkerCommand) {
        match cmd {
            WorkerCommand::SaveProfile { profile, reply_tx } => {
                let result = self.save_profile(&profile);
                respond(reply_tx, result);
            }
            WorkerCommand::LoadProfile { reply_tx } => {
                respond(reply_tx, self.vault.load().map_err(Into::into));
            }
            WorkerCommand::DeleteProfile { reply_tx } => {
                respond(reply_tx, self.vault.delete().map_err(Into::into));
            }

            WorkerCommand::Connect {
                profile,
                cancel,
                reply_tx,
            } => {
                let result = self.connect(&profile, &cancel).await;
                respond(reply_tx, result);
            }
            WorkerCommand::AutoLogin { cancel, reply_tx } => {
                let result = self.auto_login(&cancel).await;
                respond(reply_tx, result);
            }
            WorkerCommand::Disconnect { reply_tx } => {
                let closed = self.sessions.disconnect().await;
                self.browser.reset(&self.config.initial_path);
                respond(reply_tx, Ok(closed));
            }

            WorkerCommand::List { path, reply_tx } => {
                let result = self.list(&path).await;
                let result = self.check_connection(result).await;
                respond(reply_tx, result);
            }
            WorkerCommand::NavigateInto { name, reply_tx } => {
                let result = self.navigate_into(&name).await;
                let result = self.check_connection(result).await;
                respond(reply_tx, result);
            }
            WorkerCommand::NavigateParent { reply_tx } => {
                let result = self.navigate_parent().await;
                let result = self.check_connection(result).await;
                respond(reply_tx, result);
            }
            WorkerCommand::Select { index, reply_tx } => {
                respond(reply_tx, Ok(self.browser.select(index)));
            }
            WorkerCommand::Activate { index, reply_tx } => {
                let result = self.activate(index).await;
                let result = self.check_connection(result).await;
                respond(reply_tx, result);
            }
            WorkerCommand::DeleteSelected { reply_tx } => {
                let result = self.delete_selected().await;
                let result = self.check_connection(result).await;
                respond(reply_tx, result);
            }
            WorkerCommand::Navigation { reply_tx } => {
                respond(reply_tx, Ok(self.snapshot()));
            }

            WorkerCommand::ListRecursive { path, reply_tx } => {
                let result = self.list_recursive(path).await;
                let result = self.check_connection(result).await;
                respond(reply_tx, result);
            }
            WorkerCommand::DeleteMany { paths, reply_tx } => {
                let result = self.delete_many(&paths).await;
                respond(reply_tx, result);
            }

            WorkerCommand::Stage {
                remote_path,
                cancel,
                reply_tx,
            } => {
                let result = self.stage(&remote_path, &cancel).await;
                let result = self.check_connection(result).await;
                respond(reply_tx, result);
            }
            WorkerCommand::StartEmbedded {
                local_path,
                reply_tx,
            } => {
                let result = self.cache.start_embedded(&local_path).await;
                respond(reply_tx, result.map_err(Into::into));
            }
            WorkerCommand::Seek {
                id,
                position_secs,
                reply_tx,
            } => {
                respond(reply_tx, self.cache.seek(id, position_secs).map_err(Into::into));
            }
            WorkerCommand::PollPosition { id, reply_tx } => {
                respond(reply_tx, self.cache.poll_position(id).map_err(Into::into));
            }
            WorkerCommand::SwitchToExternal { id, reply_tx } => {
                respond(reply_tx, self.cache.switch_to_external(id).map_err(Into::into));
            }
            WorkerCommand::PlayExternal {
                local_path,
                reply_tx,
            } => {
                respond(reply_tx, self.cache.play_external(&local_path).map_err(Into::into));
            }
            WorkerCommand::Stop { id, reply_tx } => {
                respond(reply_tx, self.cache.stop(id).map_err(Into::into));
            }
            WorkerCommand::SetStagingDir { dir, reply_tx } => {
                respond(reply_tx, self.cache.set_staging_dir(dir).map_err(Into::into));
            }

            WorkerCommand::Shutdown { reply_tx } => {
                self.shutdown().await;
                let _ = reply_tx.send(());
            }
        }
    }

    /// Tear the session down when a request found it dead
    async fn check_connection<T>(&mut self, result: Result<T, WorkerError>) -> Result<T, WorkerError> {
        if let Err(e) = &result {
            if e.is_connection_lost() {
                self.on_connection_lost(&e.to_string()).await;
            }
        }
        result
    }

    async fn on_connection_lost(&mut self, reason: &str) {
        self.sessions.connection_lost(reason).await;
        self.browser.reset(&self.config.initial_path);
    }

    fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            context: self.browser.context().clone(),
            rows: self.browser.rows(),
            selected: self.browser.selected(),
        }
    }

    fn save_profile(&mut self, profile: &ServerProfile) -> Result<(), WorkerError> {
        profile
            .validate()
            .map_err(|e| WorkerError::Vault(e.into()))?;
        self.vault.save(profile)?;
        Ok(())
    }

    async fn connect(
        &mut self,
        profile: &ServerProfile,
        cancel: &CancelToken,
    ) -> Result<Connected, WorkerError> {
        self.browser.reset(&self.config.initial_path);
        let handle = self.sessions.connect(profile, cancel).await?;

        let initial = self.config.initial_path.clone();
        let listing = self.list(&initial).await;
        let listing_error = match self.check_connection(listing).await {
            Ok(_) => None,
            Err(e) => {
                warn!("Initial listing of {} failed: {}", initial, e);
                Some(e)
            }
        };

        Ok(Connected {
            handle,
            navigation: self.snapshot(),
            listing_error,
        })
    }

    async fn auto_login(&mut self, cancel: &CancelToken) -> Result<Option<Connected>, WorkerError> {
        if !self.vault.exists() {
            info!("No saved server details; skipping auto-login");
            return Ok(None);
        }
        let profile = self.vault.load()?;
        info!("Auto-login to {}", profile.address());
        let connected = self.connect(&profile, cancel).await?;
        Ok(Some(connected))
    }

    async fn list(&mut self, path: &str) -> Result<NavigationSnapshot, WorkerError> {
        let fs = self.sessions.remote()?;
        self.browser.list(fs, path).await?;
        Ok(self.snapshot())
    }

    async fn navigate_into(&mut self, name: &str) -> Result<NavigationSnapshot, WorkerError> {
        let fs = self.sessions.remote()?;
        self.browser.navigate_into_named(fs, name).await?;
        Ok(self.snapshot())
    }

    async fn navigate_parent(&mut self) -> Result<ParentOutcome, WorkerError> {
        let fs = self.sessions.remote()?;
        Ok(self.browser.navigate_parent(fs).await?)
    }

    async fn activate(&mut self, index: usize) -> Result<Activation, WorkerError> {
        let fs = self.sessions.remote()?;
        Ok(self.browser.activate(fs, index).await?)
    }

    async fn delete_selected(&mut self) -> Result<String, WorkerError> {
        let fs = self.sessions.remote()?;
        Ok(self.browser.delete_selected(fs).await?)
    }

    async fn list_recursive(&mut self, path: Option<String>) -> Result<RecursiveListing, WorkerError> {
        let fs = self.sessions.remote()?;
        let target = path.unwrap_or_else(|| self.browser.selected_directory());
        Ok(sftp::list_recursive(fs, &target).await?)
    }

    async fn delete_many(&mut self, paths: &[String]) -> Result<BulkResult, WorkerError> {
        let fs = self.sessions.remote()?;
        let result = sftp::delete_many(fs, paths).await;
        if result.lost_connection() {
            self.on_connection_lost("connection lost during bulk delete")
                .await;
        }
        Ok(result.into_result()?)
    }

    async fn stage(&mut self, remote_path: &str, cancel: &CancelToken) -> Result<PathBuf, WorkerError> {
        let fs = self.sessions.remote()?;
        Ok(self.cache.stage(fs, remote_path, cancel).await?)
    }

    async fn shutdown(&mut self) {
        self.cache.stop_all();
        self.sessions.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::playback::fakes::{RecordingEngine, RecordingPlayer};
    use crate::playback::{Backend, PlaybackError};
    use crate::sftp::testing::{ConnectBehavior, MemoryConnector, MemoryFs};
    use crate::sftp::{ItemFailure, SftpError};
    use crate::ssh::SessionError;
    use crate::vault::VaultError;

    struct Harness {
        controller: WorkerController,
        connector: Arc<MemoryConnector>,
        fs: MemoryFs,
        engine: RecordingEngine,
        dir: tempfile::TempDir,
    }

    fn sample_tree() -> MemoryFs {
        MemoryFs::new()
            .dir("/docs")
            .file("/docs/a.mp3", b"aaa")
            .file("/docs/b.mp3", b"bbb")
            .dir("/docs/live")
            .file("/docs/live/c.flac", b"ccc")
            .file("/song.mp3", b"ID3")
    }

    fn harness(fs: MemoryFs) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(MemoryConnector::new(fs.clone()));
        let vault = CredentialVault::new(
            dir.path().join("encryption.key"),
            dir.path().join("server_details.enc"),
        );
        let staging = dir.path().join("staging");
        std::fs::create_dir(&staging).unwrap();
        let engine = RecordingEngine::default();
        let cache = PlaybackCache::new(
            staging,
            Some(Box::new(engine.clone())),
            Box::new(RecordingPlayer::default()),
        );
        let controller = spawn_worker(connector.clone(), vault, cache, AppConfig::default());
        Harness {
            controller,
            connector,
            fs,
            engine,
            dir,
        }
    }

    fn profile() -> ServerProfile {
        ServerProfile::new("10.0.0.5", 22, "bob", "s3cret")
    }

    #[tokio::test]
    async fn test_connect_lists_initial_path() {
        let h = harness(sample_tree());
        let connected = h.controller.connect(profile(), CancelToken::new()).await.unwrap();
        assert_eq!(connected.handle.username, "bob");
        assert!(connected.listing_error.is_none());
        assert_eq!(connected.navigation.labels(), vec!["[DIR] docs", "song.mp3"]);
        assert_eq!(h.controller.session_state(), SessionState::Connected);

        let nav = h.controller.navigation().await.unwrap();
        assert_eq!(nav.context.current_path, "/");
        assert_eq!(nav.labels(), vec!["[DIR] docs", "song.mp3"]);
    }

    #[tokio::test]
    async fn test_connect_reports_failed_initial_listing() {
        let h = harness(sample_tree().fail_list("/"));
        let connected = h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        assert!(matches!(connected.listing_error, Some(WorkerError::Sftp(_))));
        assert!(connected.navigation.context.last_listing.is_empty());
        // the session itself is usable
        assert!(h.controller.session_state().is_connected());
        let nav = h.controller.list("/docs").await.unwrap();
        assert_eq!(nav.context.current_path, "/docs");
    }

    #[tokio::test]
    async fn test_connect_lost_during_initial_listing() {
        let h = harness(sample_tree().lose_connection_on_list("/"));
        let connected = h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        let err = connected.listing_error.unwrap();
        assert!(err.is_connection_lost());
        assert_eq!(h.controller.session_state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_browse_round_trip() {
        let h = harness(sample_tree());
        h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        let nav = h.controller.navigate_into("docs").await.unwrap();
        assert_eq!(nav.context.current_path, "/docs");
        assert_eq!(nav.rows[0], ListingRow::ParentMarker);

        assert_eq!(
            h.controller.navigate_parent().await.unwrap(),
            ParentOutcome::Navigated
        );
        assert_eq!(
            h.controller.navigate_parent().await.unwrap(),
            ParentOutcome::AlreadyAtRoot
        );

        let activation = h.controller.activate(0).await.unwrap();
        assert_eq!(activation, Activation::EnteredDirectory("/docs".to_string()));
    }

    #[tokio::test]
    async fn test_requests_need_a_session() {
        let h = harness(sample_tree());
        let err = h.controller.list("/").await.unwrap_err();
        assert!(matches!(err, WorkerError::Session(SessionError::NotConnected)));

        // navigation state is still readable
        let nav = h.controller.navigation().await.unwrap();
        assert!(nav.context.last_listing.is_empty());
    }

    #[tokio::test]
    async fn test_profile_round_trip_and_auto_login() {
        let h = harness(sample_tree());
        assert!(h.controller.auto_login(CancelToken::new()).await.unwrap().is_none());
        assert_eq!(h.connector.attempts(), 0);

        h.controller.save_profile(profile()).await.unwrap();
        assert_eq!(h.controller.load_profile().await.unwrap(), profile());

        let connected = h.controller.auto_login(CancelToken::new()).await.unwrap();
        assert!(connected.is_some());
        assert!(h.controller.session_state().is_connected());

        h.controller.delete_profile().await.unwrap();
        assert!(matches!(
            h.controller.load_profile().await,
            Err(WorkerError::Vault(VaultError::NotFound))
        ));
    }

    #[tokio::test]
    async fn test_invalid_profile_not_saved() {
        let h = harness(sample_tree());
        let bad = ServerProfile::new("", 22, "bob", "pw");
        assert!(matches!(
            h.controller.save_profile(bad).await,
            Err(WorkerError::Vault(VaultError::InvalidProfile(_)))
        ));
        assert!(!h.dir.path().join("server_details.enc").exists());
    }

    #[tokio::test]
    async fn test_cancel_connect_while_worker_busy() {
        let h = harness(sample_tree());
        h.connector.set_behavior(ConnectBehavior::Hang);

        let cancel = CancelToken::new();
        let controller = h.controller.clone();
        let attempt = tokio::spawn({
            let cancel = cancel.clone();
            async move { controller.connect(profile(), cancel).await }
        });

        let mut states = h.controller.subscribe_state();
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|s| *s == SessionState::Connecting),
        )
        .await
        .unwrap()
        .unwrap();

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), attempt)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            result,
            Err(WorkerError::Session(SessionError::Cancelled))
        ));
        assert_eq!(h.controller.session_state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_bulk_view_of_selected_directory() {
        let h = harness(sample_tree().deny_remove("/docs/b.mp3"));
        h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        h.controller.select(0).await.unwrap();
        let listing = h.controller.list_recursive(None).await.unwrap();
        assert_eq!(
            listing.files,
            vec!["/docs/a.mp3", "/docs/b.mp3", "/docs/live/c.flac"]
        );

        let err = h.controller.delete_many(listing.files.clone()).await.unwrap_err();
        let result = match err {
            WorkerError::Sftp(SftpError::PartialBulkFailure(result)) => result,
            other => panic!("expected partial failure, got {other:?}"),
        };
        assert_eq!(result.succeeded, vec!["/docs/a.mp3", "/docs/live/c.flac"]);
        assert_eq!(result.failed["/docs/b.mp3"], ItemFailure::PermissionDenied);
        assert!(h.controller.session_state().is_connected());
    }

    #[tokio::test]
    async fn test_delete_selected_relists() {
        let h = harness(sample_tree());
        h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        h.controller.select(1).await.unwrap();
        assert_eq!(h.controller.delete_selected().await.unwrap(), "/song.mp3");
        let nav = h.controller.navigation().await.unwrap();
        assert_eq!(nav.labels(), vec!["[DIR] docs"]);
    }

    #[tokio::test]
    async fn test_connection_lost_resets_session() {
        let h = harness(sample_tree().lose_connection_on_list("/docs"));
        h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        let err = h.controller.navigate_into("docs").await.unwrap_err();
        assert!(err.is_connection_lost());
        assert_eq!(h.controller.session_state(), SessionState::Disconnected);
        assert!(h.fs.is_closed());

        let nav = h.controller.navigation().await.unwrap();
        assert!(nav.context.last_listing.is_empty());
        assert!(matches!(
            h.controller.list("/").await,
            Err(WorkerError::Session(SessionError::NotConnected))
        ));
    }

    #[tokio::test]
    async fn test_stage_and_play() {
        let h = harness(sample_tree());
        h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        let local = h
            .controller
            .stage("/song.mp3", CancelToken::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"ID3");

        let session = h.controller.start_embedded(local.clone()).await.unwrap();
        assert_eq!(session.remote_path.as_deref(), Some("/song.mp3"));
        assert!(matches!(
            h.controller.start_embedded(local.clone()).await,
            Err(WorkerError::Playback(PlaybackError::AlreadyActive))
        ));

        *h.engine.position.lock() = Some(5.0);
        assert_eq!(h.controller.poll_position(session.id).await.unwrap(), Some(5.0));

        let seeked = h.controller.seek(session.id, 30.0).await.unwrap();
        assert_eq!(seeked.position_secs, 30.0);

        let handed = h.controller.switch_to_external(session.id).await.unwrap();
        assert_eq!(handed.local_path, local);
        assert_eq!(handed.backend, Backend::External);
        assert!(matches!(
            h.controller.stop(session.id).await,
            Err(WorkerError::Playback(PlaybackError::NoActivePlayback))
        ));
    }

    #[tokio::test]
    async fn test_set_staging_dir() {
        let h = harness(sample_tree());
        h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        let other = h.dir.path().join("other");
        std::fs::create_dir(&other).unwrap();
        h.controller.set_staging_dir(other.clone()).await.unwrap();
        let local = h.controller.stage("/song.mp3", CancelToken::new()).await.unwrap();
        assert_eq!(local, other.join("song.mp3"));

        assert!(h
            .controller
            .set_staging_dir(h.dir.path().join("missing"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_shutdown_closes_session() {
        let h = harness(sample_tree());
        h.controller.connect(profile(), CancelToken::new()).await.unwrap();

        h.controller.shutdown().await;
        assert!(h.fs.is_closed());
        assert!(matches!(
            h.controller.navigation().await,
            Err(WorkerError::WorkerGone)
        ));
    }
}
