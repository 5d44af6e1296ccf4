use serde::{Deserialize, Serialize};

/// Sample rate every recording is encoded at.
pub const RECORDING_SAMPLE_RATE: u32 = 44_100;

/// Channel count every recording is encoded at.
pub const RECORDING_CHANNELS: u16 = 1;

/// Encoder quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Smaller files.
    Medium,
    /// Highest fidelity the sink supports.
    #[default]
    High,
}

impl Quality {
    /// PCM bit depth the WAV sink uses for this tier.
    pub fn bits_per_sample(self) -> u16 {
        match self {
            Quality::Medium => 16,
            Quality::High => 24,
        }
    }
}

/// Format requested from the encode sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Quality tier.
    pub quality: Quality,
}

impl AudioFormat {
    /// The fixed recording format: mono, 44.1kHz, at the given quality.
    pub fn recording(quality: Quality) -> Self {
        Self {
            channels: RECORDING_CHANNELS,
            sample_rate: RECORDING_SAMPLE_RATE,
            quality,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::recording(Quality::High)
    }
}
