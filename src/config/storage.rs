//! Configuration Storage
//!
//! `config.json` lives in [`config_dir`]. Startup goes through
//! [`ConfigStorage::load_or_init`], which always leaves a readable file on
//! disk: a missing file is created with defaults, and an unparsable one is
//! moved aside and replaced.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::types::{AppConfig, CONFIG_VERSION};

const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config version {found} is newer than supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },
}

/// Get the application configuration directory
pub fn config_dir() -> Result<PathBuf, StorageError> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("SftpMedia"));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".sftp-media"))
        .ok_or(StorageError::NoConfigDir)
}

/// How [`ConfigStorage::load_or_init`] arrived at its config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Parsed from the existing file
    Loaded,
    /// No file existed; defaults were written
    Created,
    /// The file did not parse. It now lives at `moved_to` and defaults were
    /// written in its place.
    Recovered { moved_to: PathBuf, reason: String },
}

pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Storage for `config.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(CONFIG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config, creating or repairing the file as needed.
    ///
    /// A file written by a newer version is left untouched and rejected.
    pub async fn load_or_init(&self) -> Result<(AppConfig, LoadOutcome), StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = AppConfig::default();
                self.save(&config).await?;
                return Ok((config, LoadOutcome::Created));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        match serde_json::from_str::<AppConfig>(&contents) {
            Ok(config) if config.version > CONFIG_VERSION => Err(StorageError::VersionTooNew {
                found: config.version,
                supported: CONFIG_VERSION,
            }),
            Ok(config) => Ok((config, LoadOutcome::Loaded)),
            Err(e) => {
                let moved_to = self.set_aside().await?;
                let config = AppConfig::default();
                self.save(&config).await?;
                Ok((
                    config,
                    LoadOutcome::Recovered {
                        moved_to,
                        reason: e.to_string(),
                    },
                ))
            }
        }
    }

    /// Save configuration to disk (temp file + rename)
    pub async fn save(&self, config: &AppConfig) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(config)?;

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Move the unreadable file to a timestamped sibling
    async fn set_aside(&self) -> Result<PathBuf, StorageError> {
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let mut target = self.path.with_extension(format!("json.corrupt.{stamp}"));
        let mut n = 1;
        while fs::metadata(&target).await.is_ok() {
            target = self
                .path
                .with_extension(format!("json.corrupt.{stamp}.{n}"));
            n += 1;
        }

        fs::rename(&self.path, &target).await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn set_aside_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt."))
            .count()
    }

    #[tokio::test]
    async fn test_missing_file_is_created() {
        let temp = tempdir().unwrap();
        let storage = ConfigStorage::in_dir(&temp.path().join("nested"));

        let (config, outcome) = storage.load_or_init().await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(outcome, LoadOutcome::Created);
        assert!(storage.path().exists());

        let (again, outcome) = storage.load_or_init().await.unwrap();
        assert_eq!(again, config);
        assert_eq!(outcome, LoadOutcome::Loaded);
    }

    #[tokio::test]
    async fn test_saved_config_is_loaded() {
        let temp = tempdir().unwrap();
        let storage = ConfigStorage::in_dir(temp.path());

        let config = AppConfig {
            staging_dir: Some(temp.path().join("stage")),
            auto_login: false,
            ..Default::default()
        };
        storage.save(&config).await.unwrap();

        let (loaded, outcome) = storage.load_or_init().await.unwrap();
        assert_eq!(loaded, config);
        assert_eq!(outcome, LoadOutcome::Loaded);
    }

    #[tokio::test]
    async fn test_corrupted_config_is_repaired_once() {
        let temp = tempdir().unwrap();
        let storage = ConfigStorage::in_dir(temp.path());
        std::fs::write(storage.path(), "{ not json").unwrap();

        let (config, outcome) = storage.load_or_init().await.unwrap();
        assert_eq!(config, AppConfig::default());
        let LoadOutcome::Recovered { moved_to, .. } = outcome else {
            panic!("expected recovery, got {outcome:?}");
        };
        assert_eq!(std::fs::read_to_string(&moved_to).unwrap(), "{ not json");

        // the repaired file parses, so a second start neither recovers nor
        // sets anything else aside
        let (config, outcome) = storage.load_or_init().await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(outcome, LoadOutcome::Loaded);
        assert_eq!(set_aside_count(temp.path()), 1);

        let on_disk: AppConfig =
            serde_json::from_str(&std::fs::read_to_string(storage.path()).unwrap()).unwrap();
        assert_eq!(on_disk, AppConfig::default());
    }

    #[tokio::test]
    async fn test_newer_version_rejected_and_kept() {
        let temp = tempdir().unwrap();
        let storage = ConfigStorage::in_dir(temp.path());
        std::fs::write(storage.path(), r#"{"version": 99}"#).unwrap();

        let result = storage.load_or_init().await;
        assert!(matches!(
            result,
            Err(StorageError::VersionTooNew { found: 99, .. })
        ));
        assert_eq!(
            std::fs::read_to_string(storage.path()).unwrap(),
            r#"{"version": 99}"#
        );
        assert_eq!(set_aside_count(temp.path()), 0);
    }
}
