//! Session lifecycle state

use serde::Serialize;

/// Where the single remote session is in its lifecycle.
///
/// `Disconnected -> Connecting -> Connected`, or `Connecting -> Failed`.
/// A connected session returns to `Disconnected` on an explicit close or
/// when the connection is lost. Nothing reconnects implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Failed(_) => "failed",
        }
    }
}

