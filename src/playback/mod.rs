//! Playback Module
//!
//! Local staging of remote media and the single embedded playback session.

mod cache;
pub mod engine;
mod error;
pub mod external;
pub mod media;

#[cfg(test)]
pub(crate) use cache::fakes;
pub use cache::{Backend, PlaybackCache, PlaybackId, PlaybackSession};
pub use engine::{AudioEngine, EngineError, PositionIndicator};
pub use error::PlaybackError;
pub use external::{ExternalPlayer, SystemPlayer};
pub use media::{is_audio_file, probe_duration};
