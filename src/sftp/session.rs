//! SFTP Session
//!
//! [`RemoteFs`] over a russh connection with the `sftp` subsystem opened.
//! The SSH handle and the SFTP session sit behind one async mutex, so at most
//! one protocol operation is ever in flight on the connection.

use std::path::Path;

use async_trait::async_trait;
use russh::client::Handle;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::fs::{RawDirEntry, RemoteError, RemoteFs};
use super::types::constants;
use crate::ssh::{ClientHandler, SessionError};

struct Inner {
    sftp: RusshSftpSession,
    handle: Handle<ClientHandler>,
    closed: bool,
}

/// SFTP Session wrapper
pub struct SftpSession {
    inner: Mutex<Inner>,
}

impl SftpSession {
    /// Open the SFTP subsystem on an authenticated connection
    pub async fn open(handle: Handle<ClientHandler>) -> Result<Self, SessionError> {
        info!("Opening SFTP subsystem");

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SessionError::Protocol(format!("Failed to open channel: {}", e)))?;

        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            SessionError::Protocol(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;

        info!("SFTP subsystem opened");

        Ok(Self {
            inner: Mutex::new(Inner {
                sftp,
                handle,
                closed: false,
            }),
        })
    }
}

#[async_trait]
impl RemoteFs for SftpSession {
    async fn list_directory(&self, path: &str) -> Result<Vec<RawDirEntry>, RemoteError> {
        let inner = self.inner.lock().await;
        ensure_open(&inner)?;
        debug!("Listing directory: {}", path);

        let metadata = inner
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;
        if !metadata.is_dir() {
            return Err(RemoteError::NotADirectory(path.to_string()));
        }

        let read_dir = inner
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }

            let metadata = entry.metadata();
            entries.push(RawDirEntry {
                name,
                is_directory: metadata.is_dir(),
                raw_mode: metadata.permissions.unwrap_or(0),
            });
        }

        debug!("Listed {} entries in {}", entries.len(), path);
        Ok(entries)
    }

    async fn is_directory(&self, path: &str) -> Result<bool, RemoteError> {
        let inner = self.inner.lock().await;
        ensure_open(&inner)?;

        let metadata = inner
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;
        Ok(metadata.is_dir())
    }

    async fn remove(&self, path: &str) -> Result<(), RemoteError> {
        let inner = self.inner.lock().await;
        ensure_open(&inner)?;

        inner
            .sftp
            .remove_file(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }

    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError> {
        let inner = self.inner.lock().await;
        ensure_open(&inner)?;
        info!("Downloading {} to {:?}", remote_path, local_path);

        let mut remote_file = inner
            .sftp
            .open(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))?;

        let local_err = |source: std::io::Error| RemoteError::Local {
            path: local_path.to_path_buf(),
            source,
        };

        let mut local_file = tokio::fs::File::create(local_path)
            .await
            .map_err(local_err)?;

        let mut buffer = vec![0u8; constants::DEFAULT_CHUNK_SIZE];
        let mut transferred = 0u64;
        loop {
            let n = remote_file
                .read(&mut buffer)
                .await
                .map_err(|e| RemoteError::Io(format!("Read failed on {}: {}", remote_path, e)))?;
            if n == 0 {
                break;
            }
            local_file.write_all(&buffer[..n]).await.map_err(local_err)?;
            transferred += n as u64;
        }

        local_file.flush().await.map_err(local_err)?;
        local_file.sync_all().await.map_err(local_err)?;

        info!("Downloaded {} bytes from {}", transferred, remote_path);
        Ok(transferred)
    }

    async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        inner.closed = true;

        if let Err(e) = inner.sftp.close().await {
            debug!("SFTP close returned: {}", e);
        }
        if let Err(e) = inner
            .handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            warn!("SSH disconnect failed: {}", e);
        }
        info!("SFTP session closed");
    }
}

fn ensure_open(inner: &Inner) -> Result<(), RemoteError> {
    if inner.closed {
        return Err(RemoteError::ConnectionLost("session closed".to_string()));
    }
    Ok(())
}

/// Map SFTP errors to our error type
fn map_sftp_error(err: SftpErrorInner, path: &str) -> RemoteError {
    match err {
        SftpErrorInner::Status(status) => match status.status_code {
            StatusCode::NoSuchFile => RemoteError::NotFound(path.to_string()),
            StatusCode::PermissionDenied => RemoteError::PermissionDenied(path.to_string()),
            StatusCode::NoConnection | StatusCode::ConnectionLost => {
                RemoteError::ConnectionLost(status.error_message)
            }
            _ => RemoteError::Io(format!("{}: {}", path, status.error_message)),
        },
        SftpErrorInner::IO(msg) => RemoteError::ConnectionLost(msg),
        other => {
            let err_str = other.to_string();
            if err_str.contains("No such file") || err_str.contains("not found") {
                RemoteError::NotFound(path.to_string())
            } else if err_str.contains("Permission denied") {
                RemoteError::PermissionDenied(path.to_string())
            } else {
                RemoteError::Io(err_str)
            }
        }
    }
}
