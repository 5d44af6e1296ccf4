//! WAV-backed encode sink and decoder using hound.

use crate::{
    CoreResult, MemoError,
    audio::{AudioFormat, EncodeSink, Encoder},
};

use std::{fs::File, io::BufWriter, panic::Location, path::Path};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, instrument};

/// Opens PCM WAV files as encode sinks.
///
/// Output is uncompressed integer PCM, not a compressed codec. The quality
/// tier selects the bit depth: [`Quality::High`] writes 24-bit samples and
/// [`Quality::Medium`] writes 16-bit samples.
///
/// [`Quality::High`]: crate::Quality::High
/// [`Quality::Medium`]: crate::Quality::Medium
#[derive(Debug, Default)]
pub struct WavEncoder;

impl WavEncoder {
    /// Create an encoder.
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for WavEncoder {
    #[track_caller]
    #[instrument(skip(self))]
    fn open(&mut self, path: &Path, format: &AudioFormat) -> CoreResult<Box<dyn EncodeSink>> {
        let bits = format.quality.bits_per_sample();
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: bits,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(path, spec).map_err(|e| MemoError::DeviceError {
            reason: format!("Failed to create {:?}: {}", path, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(path = ?path, bits, "WAV sink opened");

        Ok(Box::new(WavSink {
            writer,
            max_value: ((1i64 << (bits - 1)) - 1) as f32,
        }))
    }
}

/// An open WAV file accepting `f32` frames.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    max_value: f32,
}

impl EncodeSink for WavSink {
    #[track_caller]
    fn write(&mut self, frames: &[f32]) -> CoreResult<()> {
        for &sample in frames {
            let scaled = (sample.clamp(-1.0, 1.0) * self.max_value) as i32;
            self.writer
                .write_sample(scaled)
                .map_err(|e| MemoError::EncodeWriteError {
                    reason: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }
        Ok(())
    }

    #[track_caller]
    fn close(self: Box<Self>) -> CoreResult<()> {
        self.writer
            .finalize()
            .map_err(|e| MemoError::FinalizeError {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// Decode a WAV file into mono `f32` samples and its sample rate.
///
/// Multi-channel files are averaged down to one channel.
#[track_caller]
pub fn read_wav(path: impl AsRef<Path>) -> CoreResult<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let reader = WavReader::open(path).map_err(|e| MemoError::DeviceError {
        reason: format!("Failed to open {:?}: {}", path, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Result<Vec<f32>, _> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect(),
        SampleFormat::Int => {
            // Convert integer samples to float
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect()
        }
    };

    let interleaved = interleaved.map_err(|e| MemoError::DeviceError {
        reason: format!("Failed to decode {:?}: {}", path, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}
