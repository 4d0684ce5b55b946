//! External player launcher
//!
//! Hands a staged file to another program and forgets about it. The child
//! is not awaited and not killed when the handle drops.

use std::path::Path;

use tracing::info;

use super::error::PlaybackError;

pub trait ExternalPlayer: Send + Sync {
    fn launch(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Launches a configured command, or the desktop's default opener
pub struct SystemPlayer {
    command: Option<String>,
}

impl SystemPlayer {
    /// `command` is split on whitespace; the file path is appended last
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }

    fn build(&self, path: &Path) -> tokio::process::Command {
        if let Some(command) = &self.command {
            let mut parts = command.split_whitespace();
            let program = parts.next().unwrap_or_default();
            let mut cmd = tokio::process::Command::new(program);
            cmd.args(parts).arg(path);
            return cmd;
        }
        default_opener(path)
    }
}

#[cfg(target_os = "windows")]
fn default_opener(path: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(path);
    cmd
}

#[cfg(target_os = "macos")]
fn default_opener(path: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn default_opener(path: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("xdg-open");
    cmd.arg(path);
    cmd
}

impl ExternalPlayer for SystemPlayer {
    fn launch(&self, path: &Path) -> Result<(), PlaybackError> {
        let mut cmd = self.build(path);
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        let child = cmd.spawn().map_err(|e| {
            PlaybackError::ExternalLaunch(format!("{}: {}", path.display(), e))
        })?;
        info!(
            "Opened {} in external player (pid {:?})",
            path.display(),
            child.id()
        );
        Ok(())
    }
}
