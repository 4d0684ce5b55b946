//! Bulk file operations
//!
//! Whole-subtree listing and multi-file deletion. A failure on one item is
//! recorded and the walk moves on; only a lost connection stops a recursive
//! listing, since nothing after it could succeed.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use tracing::{info, warn};

use super::browser::list_entries;
use super::error::SftpError;
use super::fs::{RemoteError, RemoteFs};
use super::path_utils::normalize_remote_path;
use super::types::{BulkResult, EntryKind, ItemFailure, ListingFailure, RecursiveListing};

/// Every file below `path`, depth-first in listing order.
///
/// Subdirectories are expanded before the next sibling is visited.
/// Directories whose listing fails are reported in `failures` and contribute
/// no paths.
pub async fn list_recursive(fs: &dyn RemoteFs, path: &str) -> Result<RecursiveListing, SftpError> {
    let root = normalize_remote_path(path);
    let mut listing = RecursiveListing::default();
    walk(fs, root.clone(), &mut listing).await?;

    info!(
        "Recursive listing of {}: {} files, {} unreadable directories",
        root,
        listing.files.len(),
        listing.failures.len()
    );
    Ok(listing)
}

fn walk<'a>(
    fs: &'a dyn RemoteFs,
    path: String,
    out: &'a mut RecursiveListing,
) -> Pin<Box<dyn Future<Output = Result<(), SftpError>> + Send + 'a>> {
    Box::pin(async move {
        let entries = match list_entries(fs, &path).await {
            Ok(entries) => entries,
            Err(e) if e.is_connection_lost() => return Err(e),
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", path, e);
                out.failures.push(ListingFailure {
                    path,
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        for entry in entries {
            match entry.kind {
                EntryKind::Directory => walk(fs, entry.full_path, out).await?,
                EntryKind::File => out.files.push(entry.full_path),
            }
        }
        Ok(())
    })
}

/// Delete one file. Directories are refused before anything is removed.
pub async fn delete_file(fs: &dyn RemoteFs, path: &str) -> Result<(), SftpError> {
    delete_one(fs, path).await.map_err(|failure| match failure {
        ItemFailure::NotAFile => SftpError::NotAFile(path.to_string()),
        ItemFailure::NotFound => SftpError::InvalidPath(path.to_string()),
        ItemFailure::ConnectionLost => SftpError::ConnectionLost(format!("while deleting {}", path)),
        other => SftpError::RemoteIo(format!("{}: {}", path, other)),
    })?;
    info!("Deleted {}", path);
    Ok(())
}

async fn delete_one(fs: &dyn RemoteFs, path: &str) -> Result<(), ItemFailure> {
    if fs.is_directory(path).await.map_err(item_failure)? {
        return Err(ItemFailure::NotAFile);
    }
    fs.remove(path).await.map_err(item_failure)
}

fn item_failure(err: RemoteError) -> ItemFailure {
    match err {
        RemoteError::NotFound(_) => ItemFailure::NotFound,
        RemoteError::NotADirectory(_) => ItemFailure::NotFound,
        RemoteError::PermissionDenied(_) => ItemFailure::PermissionDenied,
        RemoteError::ConnectionLost(_) => ItemFailure::ConnectionLost,
        other => ItemFailure::Remote(other.to_string()),
    }
}

/// Attempt to delete every path independently.
///
/// Duplicates are attempted once. Each distinct input ends up in exactly one
/// of `succeeded` or `failed`.
pub async fn delete_many<S: AsRef<str>>(fs: &dyn RemoteFs, paths: &[S]) -> BulkResult {
    let mut seen = HashSet::new();
    let mut result = BulkResult::default();

    for path in paths.iter().map(AsRef::as_ref) {
        if !seen.insert(path) {
            continue;
        }
        match delete_one(fs, path).await {
            Ok(()) => {
                info!("Deleted {}", path);
                result.succeeded.push(path.to_string());
            }
            Err(failure) => {
                warn!("Failed to delete {}: {}", path, failure);
                result.failed.insert(path.to_string(), failure);
            }
        }
    }

    info!(
        "Bulk delete finished: {} deleted, {} failed",
        result.succeeded.len(),
        result.failed.len()
    );
    result
}

impl BulkResult {
    /// `PartialBulkFailure` unless every item succeeded
    pub fn into_result(self) -> Result<BulkResult, SftpError> {
        if self.is_complete_success() {
            Ok(self)
        } else {
            Err(SftpError::PartialBulkFailure(self))
        }
    }

    /// Whether any item failed because the session went away
    pub fn lost_connection(&self) -> bool {
        self.failed
            .values()
            .any(|f| matches!(f, ItemFailure::ConnectionLost))
    }
}
