//! Configuration Management Module
//!
//! Persistent application settings: staging directory, connect timeouts,
//! vault/key/log file locations and the external player command.

pub mod storage;
pub mod types;

pub use storage::{config_dir, ConfigStorage, LoadOutcome, StorageError};
pub use types::{AppConfig, CONFIG_VERSION};
