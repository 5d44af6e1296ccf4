use crate::{
    CoreResult, MemoError,
    audio::{FinishCallback, OutputDevice, PlaybackHandle, Resampler, read_wav},
};

use std::{
    panic::Location,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument};

/// Default system output via cpal, playing WAV recordings.
#[derive(Debug, Default)]
pub struct CpalOutputDevice;

impl CpalOutputDevice {
    /// Create a handle to the default output device.
    pub fn new() -> Self {
        Self
    }
}

impl OutputDevice for CpalOutputDevice {
    #[track_caller]
    #[instrument(skip(self))]
    fn open(&mut self, path: &Path) -> CoreResult<Box<dyn PlaybackHandle>> {
        let (samples, file_rate) = read_wav(path)?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(MemoError::DeviceError {
                reason: "No output device found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| MemoError::DeviceError {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .into();

        let samples = if file_rate != config.sample_rate {
            Resampler::new(file_rate, config.sample_rate)?.resample(&samples)?
        } else {
            samples
        };

        debug!(
            path = ?path,
            frames = samples.len(),
            sample_rate = config.sample_rate,
            "Recording decoded for playback"
        );

        Ok(Box::new(CpalPlaybackHandle {
            device,
            config,
            samples: Arc::from(samples),
            stream: None,
            stopped: Arc::new(AtomicBool::new(false)),
        }))
    }
}

struct CpalPlaybackHandle {
    device: Device,
    config: StreamConfig,
    samples: Arc<[f32]>,
    stream: Option<Stream>,
    stopped: Arc<AtomicBool>,
}

impl PlaybackHandle for CpalPlaybackHandle {
    #[track_caller]
    fn play(&mut self, on_finish: FinishCallback) -> CoreResult<()> {
        let samples = Arc::clone(&self.samples);
        let stopped = Arc::clone(&self.stopped);
        let channels = usize::from(self.config.channels.max(1));
        let mut position = 0usize;
        let mut on_finish = Some(on_finish);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if stopped.load(Ordering::Acquire) {
                        out.fill(0.0);
                        return;
                    }

                    // Mono source duplicated into every output channel.
                    for frame in out.chunks_mut(channels) {
                        let sample = samples.get(position).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        position = position.saturating_add(1);
                    }

                    if position >= samples.len() {
                        if let Some(notify) = on_finish.take() {
                            notify();
                        }
                    }
                },
                |err| {
                    error!("Audio output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| MemoError::DeviceError {
                reason: format!("Failed to build output stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| MemoError::DeviceError {
            reason: format!("Failed to start output stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.stream = Some(stream);
        info!(frames = self.samples.len(), "Audio playback started");

        Ok(())
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!(error = %e, "Pause before release failed");
            }
            drop(stream);
        }
    }
}

impl Drop for CpalPlaybackHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
