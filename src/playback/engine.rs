//! Embedded audio engine seam and the position indicator

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

/// Decoder and output device driven by [`super::PlaybackCache`].
///
/// One track at a time. `play` replaces whatever was playing.
pub trait AudioEngine: Send {
    /// Start `path` at `start_secs`, repeating from the top when `looping`
    fn play(&mut self, path: &Path, start_secs: f64, looping: bool) -> Result<(), EngineError>;

    fn stop(&mut self);

    /// Current position within the track, if anything is playing
    fn position_secs(&self) -> Option<f64>;
}

/// Seconds of drift between the shown and the real position that are
/// tolerated before the shown value is corrected.
pub const RESYNC_TOLERANCE_SECS: f64 = 1.0;

/// The position the user sees, kept apart from the engine's position so a
/// poll only moves it when the two have drifted apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionIndicator {
    displayed: f64,
}

impl PositionIndicator {
    pub fn new(start: f64) -> Self {
        Self { displayed: start }
    }

    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    /// Set by a user action such as a seek
    pub fn set(&mut self, position: f64) {
        self.displayed = position;
    }

    /// Adopt `authoritative` if it is more than the tolerance away
    pub fn resync(&mut self, authoritative: f64) -> Option<f64> {
        if (authoritative - self.displayed).abs() > RESYNC_TOLERANCE_SECS {
            self.displayed = authoritative;
            Some(authoritative)
        } else {
            None
        }
    }
}
