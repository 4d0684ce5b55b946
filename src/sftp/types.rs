//! SFTP data types

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One file or directory reported by a listing.
///
/// Immutable once produced; the next listing of the same path supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File name (not full path)
    pub name: String,
    /// Full path
    pub full_path: String,
    pub kind: EntryKind,
    /// Mode bits as reported by the server, kept for display only
    pub raw_mode: u32,
}

impl RemoteEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Get icon name for UI
    pub fn icon(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "folder",
        }
    }
}

/// A row of the browser listing as presented to the user.
///
/// Rows carry their entry, so a selection index never has to be translated
/// back into a path by offset arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListingRow {
    ParentMarker,
    Entry(RemoteEntry),
}

impl ListingRow {
    pub fn label(&self) -> String {
        match self {
            ListingRow::ParentMarker => "[PARENT DIR] ..".to_string(),
            ListingRow::Entry(entry) if entry.is_dir() => format!("[DIR] {}", entry.name),
            ListingRow::Entry(entry) => entry.name.clone(),
        }
    }

    pub fn entry(&self) -> Option<&RemoteEntry> {
        match self {
            ListingRow::ParentMarker => None,
            ListingRow::Entry(entry) => Some(entry),
        }
    }
}

/// Why a single item of a bulk operation failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ItemFailure {
    NotAFile,
    NotFound,
    PermissionDenied,
    ConnectionLost,
    Remote(String),
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFailure::NotAFile => write!(f, "not a file (directories cannot be deleted)"),
            ItemFailure::NotFound => write!(f, "no such file"),
            ItemFailure::PermissionDenied => write!(f, "permission denied"),
            ItemFailure::ConnectionLost => write!(f, "connection lost"),
            ItemFailure::Remote(msg) => write!(f, "{}", msg),
        }
    }
}

/// Outcome of a multi-file delete: every input path lands in exactly one
/// of `succeeded` or `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub succeeded: Vec<String>,
    pub failed: BTreeMap<String, ItemFailure>,
}

impl BulkResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A directory whose listing failed during a recursive walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFailure {
    pub path: String,
    pub reason: String,
}

/// Files found under a subtree, plus the subtrees that could not be read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursiveListing {
    pub files: Vec<String>,
    pub failures: Vec<ListingFailure>,
}

/// Constants for SFTP operations
pub mod constants {
    /// Chunk size for staging downloads (256 KB)
    pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;
}
