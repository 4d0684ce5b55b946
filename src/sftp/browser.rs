//! Remote Browser
//!
//! Tracks the current remote directory and its last listing. Every listing
//! goes through [`list_entries`], which is a pure function of the session and
//! the path; the browser only records what succeeded.

use serde::Serialize;
use tracing::{debug, info};

use super::bulk;
use super::error::SftpError;
use super::fs::RemoteFs;
use super::path_utils::{is_root, join_remote_path, normalize_remote_path, parent_remote_path};
use super::types::{EntryKind, ListingRow, RemoteEntry};

/// List the direct children of `path` in the order the server returns them.
pub async fn list_entries(fs: &dyn RemoteFs, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
    let raw = fs
        .list_directory(path)
        .await
        .map_err(|e| SftpError::from_listing(e, path))?;

    Ok(raw
        .into_iter()
        .map(|item| RemoteEntry {
            full_path: join_remote_path(path, &item.name),
            name: item.name,
            kind: if item.is_directory {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            raw_mode: item.raw_mode,
        })
        .collect())
}

/// Current directory and what was in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationContext {
    pub current_path: String,
    pub last_listing: Vec<RemoteEntry>,
}

/// Result of moving up one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentOutcome {
    Navigated,
    /// Informational, not an error: nothing was asked of the server
    AlreadyAtRoot,
}

/// Result of a double-activation on a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Activation {
    EnteredDirectory(String),
    Parent(ParentOutcome),
    /// Files are left to explicit staging or playback actions
    FileIgnored(String),
}

pub struct RemoteBrowser {
    context: NavigationContext,
    selected: Option<usize>,
}

impl RemoteBrowser {
    /// Browser positioned at `root` with nothing listed yet
    pub fn new(root: &str) -> Self {
        Self {
            context: NavigationContext {
                current_path: normalize_remote_path(root),
                last_listing: Vec::new(),
            },
            selected: None,
        }
    }

    pub fn context(&self) -> &NavigationContext {
        &self.context
    }

    pub fn current_path(&self) -> &str {
        &self.context.current_path
    }

    pub fn is_at_root(&self) -> bool {
        is_root(&self.context.current_path)
    }

    /// Rows as shown to the user: a parent marker first unless at root
    pub fn rows(&self) -> Vec<ListingRow> {
        let mut rows = Vec::with_capacity(self.context.last_listing.len() + 1);
        if !self.is_at_root() {
            rows.push(ListingRow::ParentMarker);
        }
        rows.extend(
            self.context
                .last_listing
                .iter()
                .cloned()
                .map(ListingRow::Entry),
        );
        rows
    }

    fn row(&self, index: usize) -> Option<ListingRow> {
        self.rows().into_iter().nth(index)
    }

    /// List `path` and make it current. On failure nothing changes.
    pub async fn list(&mut self, fs: &dyn RemoteFs, path: &str) -> Result<&[RemoteEntry], SftpError> {
        let path = normalize_remote_path(path);
        let entries = list_entries(fs, &path).await?;
        info!("Listed {} ({} entries)", path, entries.len());

        self.context.current_path = path;
        self.context.last_listing = entries;
        self.selected = None;
        Ok(&self.context.last_listing)
    }

    /// Re-list the current directory
    pub async fn refresh(&mut self, fs: &dyn RemoteFs) -> Result<&[RemoteEntry], SftpError> {
        let path = self.context.current_path.clone();
        self.list(fs, &path).await
    }

    pub async fn navigate_into(
        &mut self,
        fs: &dyn RemoteFs,
        entry: &RemoteEntry,
    ) -> Result<&[RemoteEntry], SftpError> {
        if entry.kind != EntryKind::Directory {
            return Err(SftpError::NotADirectory(entry.full_path.clone()));
        }
        let child = join_remote_path(&self.context.current_path, &entry.name);
        self.list(fs, &child).await
    }

    /// Navigate into the directory called `name` in the last listing
    pub async fn navigate_into_named(
        &mut self,
        fs: &dyn RemoteFs,
        name: &str,
    ) -> Result<&[RemoteEntry], SftpError> {
        let entry = self
            .context
            .last_listing
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| {
                SftpError::InvalidPath(join_remote_path(&self.context.current_path, name))
            })?;
        self.navigate_into(fs, &entry).await
    }

    pub async fn navigate_parent(&mut self, fs: &dyn RemoteFs) -> Result<ParentOutcome, SftpError> {
        let Some(parent) = parent_remote_path(&self.context.current_path) else {
            info!("Already at root directory");
            return Ok(ParentOutcome::AlreadyAtRoot);
        };
        self.list(fs, &parent).await?;
        Ok(ParentOutcome::Navigated)
    }

    /// Highlight a row without navigating
    pub fn select(&mut self, index: usize) -> Option<ListingRow> {
        let row = self.row(index);
        match &row {
            Some(r) => {
                debug!("Highlighted: {}", r.label());
                self.selected = Some(index);
            }
            None => self.selected = None,
        }
        row
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<ListingRow> {
        self.selected.and_then(|i| self.row(i))
    }

    /// Double-activation on a row
    pub async fn activate(&mut self, fs: &dyn RemoteFs, index: usize) -> Result<Activation, SftpError> {
        let row = self.row(index).ok_or(SftpError::NoSelection)?;
        match row {
            ListingRow::ParentMarker => {
                let outcome = self.navigate_parent(fs).await?;
                Ok(Activation::Parent(outcome))
            }
            ListingRow::Entry(entry) if entry.is_dir() => {
                self.navigate_into(fs, &entry).await?;
                Ok(Activation::EnteredDirectory(self.context.current_path.clone()))
            }
            ListingRow::Entry(entry) => Ok(Activation::FileIgnored(entry.full_path)),
        }
    }

    /// Target of a recursive view: the selected directory, else the current one
    pub fn selected_directory(&self) -> String {
        match self.selected() {
            Some(ListingRow::Entry(entry)) if entry.is_dir() => entry.full_path,
            _ => self.context.current_path.clone(),
        }
    }

    /// Delete the selected file and re-list. Returns the deleted path.
    pub async fn delete_selected(&mut self, fs: &dyn RemoteFs) -> Result<String, SftpError> {
        let path = match self.selected().ok_or(SftpError::NoSelection)? {
            ListingRow::ParentMarker => return Err(SftpError::NotAFile("..".to_string())),
            ListingRow::Entry(entry) if entry.is_dir() => {
                return Err(SftpError::NotAFile(entry.full_path))
            }
            ListingRow::Entry(entry) => entry.full_path,
        };

        bulk::delete_file(fs, &path).await?;
        self.refresh(fs).await?;
        Ok(path)
    }

    /// Forget everything, as after a disconnect
    pub fn reset(&mut self, root: &str) {
        *self = Self::new(root);
    }
}
