//! Application configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Current config file version
pub const CONFIG_VERSION: u32 = 1;

/// Default key file name (raw symmetric key bytes)
pub const DEFAULT_KEY_FILE: &str = "encryption.key";

/// Default encrypted profile file name
pub const DEFAULT_VAULT_FILE: &str = "server_details.enc";

/// Default log file name
pub const DEFAULT_LOG_FILE: &str = "file_manager.log";

/// Persisted application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Where staged media is written. `None` means the user's home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_keepalive")]
    pub keepalive_interval_secs: u64,

    /// Path listed right after a successful connect
    #[serde(default = "default_initial_path")]
    pub initial_path: String,

    /// Connect with the saved profile on startup
    #[serde(default = "default_true")]
    pub auto_login: bool,

    /// Command used to hand a file to an external player.
    /// `None` uses the platform opener.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_player: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_keepalive() -> u64 {
    30
}

fn default_initial_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            staging_dir: None,
            connect_timeout_secs: default_connect_timeout(),
            keepalive_interval_secs: default_keepalive(),
            initial_path: default_initial_path(),
            auto_login: true,
            external_player: None,
            key_file: None,
            vault_file: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// Staging directory, falling back to the home directory (or the
    /// process working directory when no home can be determined).
    pub fn staging_dir_or_default(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn key_file_in(&self, base: &std::path::Path) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| base.join(DEFAULT_KEY_FILE))
    }

    pub fn vault_file_in(&self, base: &std::path::Path) -> PathBuf {
        self.vault_file
            .clone()
            .unwrap_or_else(|| base.join(DEFAULT_VAULT_FILE))
    }

    pub fn log_file_in(&self, base: &std::path::Path) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| base.join(DEFAULT_LOG_FILE))
    }
}
