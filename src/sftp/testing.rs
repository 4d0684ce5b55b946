//! In-memory remote file system for tests
//!
//! Keeps directory children in insertion order so tests can check that
//! listings come back in server order. Failures are injected per path.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::fs::{RawDirEntry, RemoteConnector, RemoteError, RemoteFs};
use super::path_utils::{join_remote_path, normalize_remote_path, parent_remote_path, remote_file_name};
use crate::ssh::SessionError;
use crate::vault::ServerProfile;

#[derive(Default)]
struct State {
    /// directory path -> ordered child names
    dirs: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<u8>>,
    failing_lists: HashSet<String>,
    denied_removes: HashSet<String>,
    lost_on_list: HashSet<String>,
    hang_fetch: bool,
    closed: bool,
    calls: Vec<String>,
}

#[derive(Clone)]
pub struct MemoryFs {
    state: Arc<Mutex<State>>,
}

impl MemoryFs {
    /// Empty tree with `/` and `.` as roots
    pub fn new() -> Self {
        let mut state = State::default();
        state.dirs.insert("/".to_string(), Vec::new());
        state.dirs.insert(".".to_string(), Vec::new());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn dir(self, path: &str) -> Self {
        let path = normalize_remote_path(path);
        {
            let mut state = self.state.lock();
            link_child(&mut state, &path);
            state.dirs.entry(path).or_default();
        }
        self
    }

    pub fn file(self, path: &str, content: &[u8]) -> Self {
        let path = normalize_remote_path(path);
        {
            let mut state = self.state.lock();
            link_child(&mut state, &path);
            state.files.insert(path, content.to_vec());
        }
        self
    }

    pub fn fail_list(self, path: &str) -> Self {
        self.state.lock().failing_lists.insert(path.to_string());
        self
    }

    pub fn deny_remove(self, path: &str) -> Self {
        self.state.lock().denied_removes.insert(path.to_string());
        self
    }

    pub fn lose_connection_on_list(self, path: &str) -> Self {
        self.state.lock().lost_on_list.insert(path.to_string());
        self
    }

    pub fn hang_fetch(self) -> Self {
        self.state.lock().hang_fetch = true;
        self
    }

    pub fn exists(&self, path: &str) -> bool {
        let state = self.state.lock();
        state.files.contains_key(path) || state.dirs.contains_key(path)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Every file path in the tree
    pub fn all_files(&self) -> HashSet<String> {
        self.state.lock().files.keys().cloned().collect()
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

fn link_child(state: &mut State, path: &str) {
    if let Some(parent) = parent_remote_path(path) {
        let name = remote_file_name(path).to_string();
        let children = state.dirs.entry(parent.clone()).or_default();
        if !children.contains(&name) {
            children.push(name);
        }
        if parent_remote_path(&parent).is_some() {
            link_child(state, &parent);
        }
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    async fn list_directory(&self, path: &str) -> Result<Vec<RawDirEntry>, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(format!("list {}", path));

        if state.closed || state.lost_on_list.contains(path) {
            return Err(RemoteError::ConnectionLost("channel closed".to_string()));
        }
        if state.failing_lists.contains(path) {
            return Err(RemoteError::PermissionDenied(path.to_string()));
        }
        if state.files.contains_key(path) {
            return Err(RemoteError::NotADirectory(path.to_string()));
        }
        let children = state
            .dirs
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))?;

        Ok(children
            .into_iter()
            .map(|name| {
                let full = join_remote_path(path, &name);
                let is_directory = state.dirs.contains_key(&full);
                RawDirEntry {
                    name,
                    is_directory,
                    raw_mode: if is_directory { 0o40755 } else { 0o100644 },
                }
            })
            .collect())
    }

    async fn is_directory(&self, path: &str) -> Result<bool, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(format!("stat {}", path));

        if state.closed {
            return Err(RemoteError::ConnectionLost("channel closed".to_string()));
        }
        if state.dirs.contains_key(path) {
            Ok(true)
        } else if state.files.contains_key(path) {
            Ok(false)
        } else {
            Err(RemoteError::NotFound(path.to_string()))
        }
    }

    async fn remove(&self, path: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(format!("remove {}", path));

        if state.closed {
            return Err(RemoteError::ConnectionLost("channel closed".to_string()));
        }
        if state.denied_removes.contains(path) {
            return Err(RemoteError::PermissionDenied(path.to_string()));
        }
        if state.dirs.contains_key(path) {
            return Err(RemoteError::Io(format!("{} is a directory", path)));
        }
        if state.files.remove(path).is_none() {
            return Err(RemoteError::NotFound(path.to_string()));
        }

        if let Some(parent) = parent_remote_path(path) {
            let name = remote_file_name(path).to_string();
            if let Some(children) = state.dirs.get_mut(&parent) {
                children.retain(|c| *c != name);
            }
        }
        Ok(())
    }

    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError> {
        let (content, hang) = {
            let mut state = self.state.lock();
            state.calls.push(format!("fetch {}", remote_path));
            if state.closed {
                return Err(RemoteError::ConnectionLost("channel closed".to_string()));
            }
            let content = state
                .files
                .get(remote_path)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(remote_path.to_string()))?;
            (content, state.hang_fetch)
        };

        if hang {
            std::future::pending::<()>().await;
        }

        std::fs::write(local_path, &content).map_err(|source| RemoteError::Local {
            path: local_path.to_path_buf(),
            source,
        })?;
        Ok(content.len() as u64)
    }

    async fn close(&self) {
        let mut state = self.state.lock();
        state.calls.push("close".to_string());
        state.closed = true;
    }
}

/// How [`MemoryConnector`] answers the next connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    Accept,
    RejectCredentials,
    Unreachable,
    Hang,
}

/// Connector handing out a fresh clone of a [`MemoryFs`]
pub struct MemoryConnector {
    fs: MemoryFs,
    behavior: Mutex<ConnectBehavior>,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(fs: MemoryFs) -> Self {
        Self {
            fs,
            behavior: Mutex::new(ConnectBehavior::Accept),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: ConnectBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Reopen the tree after a `close`, as a reconnect would
    fn reopen(&self) -> MemoryFs {
        self.fs.state.lock().closed = false;
        self.fs.clone()
    }
}

#[async_trait]
impl RemoteConnector for MemoryConnector {
    async fn connect(&self, profile: &ServerProfile) -> Result<Box<dyn RemoteFs>, SessionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock();
        match behavior {
            ConnectBehavior::Accept => Ok(Box::new(self.reopen())),
            ConnectBehavior::RejectCredentials => Err(SessionError::Authentication(format!(
                "server rejected credentials for {}",
                profile.username
            ))),
            ConnectBehavior::Unreachable => Err(SessionError::Network(format!(
                "{} is unreachable",
                profile.address()
            ))),
            ConnectBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}
