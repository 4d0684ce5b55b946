//! Playback Cache
//!
//! Stages remote files into a local directory and owns the single embedded
//! playback session. Handing a file to the external player ends the session:
//! nothing here controls playback once it leaves the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::engine::{AudioEngine, PositionIndicator};
use super::error::PlaybackError;
use super::external::ExternalPlayer;
use super::media::probe_duration;
use crate::cancel::CancelToken;
use crate::sftp::path_utils::remote_file_name;
use crate::sftp::{RemoteError, RemoteFs};

/// Suffix of a download that has not finished yet
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PlaybackId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Embedded,
    External,
}

/// The one playback the cache tracks. A live session is always `Embedded`;
/// the session handed back by a switch is `External` and already ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSession {
    pub id: PlaybackId,
    /// Where the file was staged from, if it was staged by this cache
    pub remote_path: Option<String>,
    pub local_path: PathBuf,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub backend: Backend,
}

pub struct PlaybackCache {
    staging_dir: PathBuf,
    engine: Option<Box<dyn AudioEngine>>,
    external: Box<dyn ExternalPlayer>,
    session: Option<PlaybackSession>,
    indicator: PositionIndicator,
    /// local copy -> remote source
    staged: HashMap<PathBuf, String>,
}

impl PlaybackCache {
    pub fn new(
        staging_dir: PathBuf,
        engine: Option<Box<dyn AudioEngine>>,
        external: Box<dyn ExternalPlayer>,
    ) -> Self {
        Self {
            staging_dir,
            engine,
            external,
            session: None,
            indicator: PositionIndicator::new(0.0),
            staged: HashMap::new(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn active(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Change where files are staged. Only an existing directory is accepted.
    pub fn set_staging_dir(&mut self, dir: PathBuf) -> Result<(), PlaybackError> {
        let metadata = std::fs::metadata(&dir).map_err(|e| PlaybackError::local(&dir, e))?;
        if !metadata.is_dir() {
            return Err(PlaybackError::local(
                &dir,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }
        info!("Staging directory changed to {}", dir.display());
        self.staging_dir = dir;
        Ok(())
    }

    /// Download `remote_path` into the staging directory under its own name,
    /// replacing an older copy. The file only appears once fully written.
    pub async fn stage(
        &mut self,
        fs: &dyn RemoteFs,
        remote_path: &str,
        cancel: &CancelToken,
    ) -> Result<PathBuf, PlaybackError> {
        let name = remote_file_name(remote_path);
        if name.is_empty() || name == "." || name == ".." {
            return Err(PlaybackError::RemoteIo(format!(
                "{} does not name a file",
                remote_path
            )));
        }

        let local_path = self.staging_dir.join(name);
        let partial_path = self.staging_dir.join(format!("{}{}", name, PARTIAL_SUFFIX));
        info!("Staging {} to {}", remote_path, local_path.display());

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PlaybackError::Cancelled),
            result = fs.fetch(remote_path, &partial_path) => result.map_err(staging_error),
        };

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e) => {
                discard_partial(&partial_path).await;
                if matches!(e, PlaybackError::Cancelled) {
                    info!("Staging of {} cancelled", remote_path);
                } else {
                    warn!("Staging of {} failed: {}", remote_path, e);
                }
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial_path, &local_path).await {
            discard_partial(&partial_path).await;
            return Err(PlaybackError::local(&local_path, e));
        }

        info!("Staged {} ({} bytes)", local_path.display(), bytes);
        self.staged.insert(local_path.clone(), remote_path.to_string());
        Ok(local_path)
    }

    /// Start looping `local_path` on the embedded engine
    pub async fn start_embedded(&mut self, local_path: &Path) -> Result<PlaybackSession, PlaybackError> {
        if self.session.is_some() {
            return Err(PlaybackError::AlreadyActive);
        }
        if self.engine.is_none() {
            return Err(PlaybackError::EngineUnavailable);
        }
        ensure_file(local_path)?;

        let probe_path = local_path.to_path_buf();
        let duration_secs = tokio::task::spawn_blocking(move || probe_duration(&probe_path))
            .await
            .unwrap_or(None);

        let engine = self.engine.as_mut().ok_or(PlaybackError::EngineUnavailable)?;
        engine.play(local_path, 0.0, true)?;

        let session = PlaybackSession {
            id: PlaybackId(Uuid::new_v4()),
            remote_path: self.staged.get(local_path).cloned(),
            local_path: local_path.to_path_buf(),
            position_secs: 0.0,
            duration_secs,
            backend: Backend::Embedded,
        };
        info!(
            "Playing {} (duration {:?}s)",
            local_path.display(),
            session.duration_secs
        );
        self.indicator = PositionIndicator::new(0.0);
        self.session = Some(session.clone());
        Ok(session)
    }

    fn session_mut(&mut self, id: PlaybackId) -> Result<&mut PlaybackSession, PlaybackError> {
        match self.session.as_mut() {
            Some(session) if session.id == id => Ok(session),
            _ => Err(PlaybackError::NoActivePlayback),
        }
    }

    fn take_session(&mut self, id: PlaybackId) -> Result<PlaybackSession, PlaybackError> {
        self.session_mut(id)?;
        self.session.take().ok_or(PlaybackError::NoActivePlayback)
    }

    /// Restart playback from `position_secs`, clamped to the track
    pub fn seek(&mut self, id: PlaybackId, position_secs: f64) -> Result<PlaybackSession, PlaybackError> {
        let (local_path, duration) = {
            let session = self.session_mut(id)?;
            (session.local_path.clone(), session.duration_secs)
        };

        let mut position = position_secs.max(0.0);
        if let Some(duration) = duration {
            position = position.min(duration);
        }

        let engine = self.engine.as_mut().ok_or(PlaybackError::EngineUnavailable)?;
        engine.stop();
        engine.play(&local_path, position, true)?;

        self.indicator.set(position);
        let session = self.session_mut(id)?;
        session.position_secs = position;
        info!("Seeked {} to {:.1}s", local_path.display(), position);
        Ok(session.clone())
    }

    /// Read the engine position. Returns a value only when the shown
    /// position has drifted far enough to need correcting.
    pub fn poll_position(&mut self, id: PlaybackId) -> Result<Option<f64>, PlaybackError> {
        let authoritative = self
            .engine
            .as_ref()
            .and_then(|engine| engine.position_secs());
        let session = self.session_mut(id)?;

        let Some(position) = authoritative else {
            return Ok(None);
        };
        session.position_secs = position;
        Ok(self.indicator.resync(position))
    }

    /// Stop embedded playback and hand the file to the external player.
    /// The session ends here either way; the returned copy records the
    /// handoff.
    pub fn switch_to_external(&mut self, id: PlaybackId) -> Result<PlaybackSession, PlaybackError> {
        let mut session = self.take_session(id)?;
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
        info!(
            "Switching {} to the external player",
            session.local_path.display()
        );
        self.external.launch(&session.local_path)?;
        session.backend = Backend::External;
        Ok(session)
    }

    /// Open a staged file externally without an embedded session
    pub fn play_external(&self, local_path: &Path) -> Result<(), PlaybackError> {
        ensure_file(local_path)?;
        self.external.launch(local_path)
    }

    pub fn stop(&mut self, id: PlaybackId) -> Result<(), PlaybackError> {
        let session = self.take_session(id)?;
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
        info!("Stopped {}", session.local_path.display());
        Ok(())
    }

    /// End any session without an id, as on shutdown
    pub fn stop_all(&mut self) {
        if let Some(session) = self.session.take() {
            if let Some(engine) = self.engine.as_mut() {
                engine.stop();
            }
            info!("Stopped {}", session.local_path.display());
        }
    }
}

fn staging_error(err: RemoteError) -> PlaybackError {
    match err {
        RemoteError::Local { path, source } => PlaybackError::LocalIo { path, source },
        RemoteError::ConnectionLost(msg) => PlaybackError::ConnectionLost(msg),
        other => PlaybackError::RemoteIo(other.to_string()),
    }
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial file {}: {}", path.display(), e),
    }
}

fn ensure_file(path: &Path) -> Result<(), PlaybackError> {
    let metadata = std::fs::metadata(path).map_err(|e| PlaybackError::local(path, e))?;
    if !metadata.is_file() {
        return Err(PlaybackError::local(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }
    Ok(())
}
