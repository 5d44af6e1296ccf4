use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Extension of recordings written into the storage directory.
pub const AUDIO_EXTENSION: &str = "wav";

/// Generate a file name for a new recording that does not exist in `dir`.
///
/// Names look like `Recording_20240131_142501_1a2b3c4d.wav`: sortable by
/// time, with a random suffix so two recordings in the same second never
/// collide.
pub fn unique_file_name(dir: &Path, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y%m%d_%H%M%S");
    loop {
        let suffix = Uuid::new_v4().simple().to_string();
        let name = format!("Recording_{}_{}.{}", timestamp, &suffix[..8], AUDIO_EXTENSION);
        if !dir.join(&name).exists() {
            return name;
        }
    }
}
