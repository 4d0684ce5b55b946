//! Session Management Module
//!
//! The single-session state machine sitting between the vault and the
//! remote browser.

mod manager;
mod state;

pub use manager::{SessionHandle, SessionManager};
pub use state::SessionState;
