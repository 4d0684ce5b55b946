//! Media probing

use std::path::Path;

use lofty::file::AudioFile;
use tracing::debug;

/// Extensions treated as playable even when the MIME table disagrees
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "ogg", "oga", "opus", "flac", "m4a", "aac", "wma", "aiff", "aif",
];

/// Whether a remote or local name looks like something the player can take
pub fn is_audio_file(name: &str) -> bool {
    let extension = Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return true;
    }

    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::AUDIO)
        .unwrap_or(false)
}

/// Track length in seconds, or `None` when the file cannot be probed
pub fn probe_duration(path: &Path) -> Option<f64> {
    match lofty::read_from_path(path) {
        Ok(tagged) => {
            let secs = tagged.properties().duration().as_secs_f64();
            (secs > 0.0).then_some(secs)
        }
        Err(e) => {
            debug!("Could not probe duration of {}: {}", path.display(), e);
            None
        }
    }
}
