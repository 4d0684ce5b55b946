//! Credential vault: one encrypted server profile on disk
//!
//! The key and the blob live in separate files. Losing or replacing the key
//! makes the blob unrecoverable; `load` then fails with [`VaultError::Crypto`].

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::crypto::{self, VaultKey};
use super::error::VaultError;
use super::profile::ServerProfile;

pub struct CredentialVault {
    key_path: PathBuf,
    blob_path: PathBuf,
    key: Option<VaultKey>,
}

impl CredentialVault {
    pub fn new(key_path: PathBuf, blob_path: PathBuf) -> Self {
        debug!(
            "CredentialVault initialized: key={:?}, blob={:?}",
            key_path, blob_path
        );
        Self {
            key_path,
            blob_path,
            key: None,
        }
    }

    pub fn blob_path(&self) -> &Path {
        &self.blob_path
    }

    /// Check if a saved profile exists
    pub fn exists(&self) -> bool {
        self.blob_path.exists()
    }

    /// Load the key, generating and persisting one if no key file exists.
    ///
    /// An existing key file is never regenerated.
    pub fn ensure_key(&mut self) -> Result<(), VaultError> {
        if self.key.is_some() {
            return Ok(());
        }

        let key = match fs::read(&self.key_path) {
            Ok(bytes) => crypto::key_from_bytes(&bytes).ok_or_else(|| {
                VaultError::KeyIo(std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("key file {:?} has an unexpected length", self.key_path),
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let key = crypto::generate_key();
                write_new_key(&self.key_path, &key[..]).map_err(VaultError::KeyIo)?;
                info!("Generated new encryption key at {:?}", self.key_path);
                key
            }
            Err(e) => return Err(VaultError::KeyIo(e)),
        };

        self.key = Some(key);
        Ok(())
    }

    fn key(&mut self) -> Result<&VaultKey, VaultError> {
        self.ensure_key()?;
        self.key
            .as_ref()
            .ok_or_else(|| VaultError::KeyIo(ErrorKind::NotFound.into()))
    }

    /// Encrypt and persist `profile`, replacing any previous blob
    pub fn save(&mut self, profile: &ServerProfile) -> Result<(), VaultError> {
        let plaintext = zeroize::Zeroizing::new(
            serde_json::to_vec(profile)
                .map_err(|e| VaultError::VaultWrite(std::io::Error::new(ErrorKind::InvalidData, e)))?,
        );

        let key = self.key()?;
        let blob = crypto::encrypt(key, &plaintext).map_err(|_| VaultError::Crypto)?;

        write_atomic(&self.blob_path, &blob).map_err(VaultError::VaultWrite)?;

        info!("Server details saved and encrypted.");
        Ok(())
    }

    /// Read, decrypt and deserialize the saved profile
    pub fn load(&mut self) -> Result<ServerProfile, VaultError> {
        let blob = match fs::read(&self.blob_path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Vault blob not found at {:?}", self.blob_path);
                return Err(VaultError::NotFound);
            }
            Err(e) => return Err(VaultError::VaultRead(e)),
        };

        let key = self.key()?;
        let plaintext = crypto::decrypt(key, &blob).map_err(|_| {
            warn!("Failed to decrypt saved server details");
            VaultError::Crypto
        })?;

        // Authenticated plaintext that still fails to parse is treated like
        // any other decryption failure: nothing partial is returned.
        let profile: ServerProfile =
            serde_json::from_slice(&plaintext).map_err(|_| VaultError::Crypto)?;
        profile.validate()?;

        info!("Server details loaded for {}@{}", profile.username, profile.address());
        Ok(profile)
    }

    /// Delete the saved profile. The key file is left in place.
    pub fn delete(&self) -> Result<(), VaultError> {
        match fs::remove_file(&self.blob_path) {
            Ok(()) => {
                info!("Saved server details deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Vault blob did not exist");
                Ok(())
            }
            Err(e) => Err(VaultError::VaultWrite(e)),
        }
    }
}

/// Create the key file; fails instead of clobbering an existing one.
fn write_new_key(path: &Path, key: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = owner_only(&mut options).open(path)?;
    file.write_all(key)?;
    file.sync_all()?;
    drop(file);

    restrict_permissions(path)
}

/// Write to a temp file, then rename over the destination
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    let mut file = owner_only(&mut options).open(&temp_path)?;
    // a stale temp file keeps its old mode, so tighten before writing
    restrict_permissions(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)
}

/// New files are created 0600 so the contents are never readable by others
fn owner_only(options: &mut fs::OpenOptions) -> &mut fs::OpenOptions {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
