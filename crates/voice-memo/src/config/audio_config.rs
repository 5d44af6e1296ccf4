use serde::{Deserialize, Serialize};
use voice_memo_core::{AudioFormat, Quality};

/// Recording format configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Encoder quality tier ("high" or "medium").
    #[serde(default)]
    pub quality: Quality,
}

impl AudioConfig {
    /// Format new recordings are written in.
    pub fn format(&self) -> AudioFormat {
        AudioFormat::recording(self.quality)
    }
}
