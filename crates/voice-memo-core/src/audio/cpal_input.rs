use crate::{
    CoreResult, MemoError,
    audio::{AudioFormat, FrameCallback, InputDevice, InputStream, PermissionCallback, Resampler},
};

use std::{
    panic::Location,
    sync::{Arc, Mutex},
    time::Duration,
};

use cpal::{
    Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, trace};

/// Default system microphone via cpal.
///
/// Frames are downmixed to mono and converted to the requested sample rate
/// before they reach the session's callback.
#[derive(Debug, Default)]
pub struct CpalInputDevice;

impl CpalInputDevice {
    /// Create a handle to the default input device.
    pub fn new() -> Self {
        Self
    }
}

impl InputDevice for CpalInputDevice {
    #[instrument(skip(self, on_result))]
    fn request_permission(&mut self, on_result: PermissionCallback) {
        // Desktop hosts gate access at the OS level; an enumerable default
        // device is the closest signal cpal gives us.
        let granted = cpal::default_host().default_input_device().is_some();
        info!(granted, "Input permission resolved");
        on_result(granted);
    }

    #[track_caller]
    #[instrument(skip(self, on_buffer))]
    fn open_input_stream(
        &mut self,
        format: &AudioFormat,
        on_buffer: FrameCallback,
    ) -> CoreResult<Box<dyn InputStream>> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(MemoError::DeviceError {
                reason: "No microphone found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let supported = device
            .default_input_config()
            .map_err(|e| MemoError::DeviceError {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = supported.into();
        let channels = usize::from(config.channels.max(1));
        let device_rate = config.sample_rate;

        let resampler = if device_rate != format.sample_rate {
            debug!(
                input_rate = device_rate,
                output_rate = format.sample_rate,
                "Input resampling enabled"
            );
            Some(Resampler::new(device_rate, format.sample_rate)?)
        } else {
            None
        };

        let pipeline = Arc::new(Mutex::new(InputPipeline {
            resampler,
            on_buffer,
            mono: Vec::with_capacity(4096),
        }));
        let callback_pipeline = Arc::clone(&pipeline);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut pipeline = callback_pipeline.lock().unwrap_or_else(|e| {
                        error!("Input pipeline lock poisoned, recovering: {}", e);
                        e.into_inner()
                    });
                    pipeline.deliver(data, channels);
                },
                |err| {
                    error!("Audio input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| MemoError::DeviceError {
                reason: format!("Failed to build stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(
            device_id = ?device.id(),
            sample_rate = device_rate,
            channels,
            "Input stream built"
        );

        Ok(Box::new(CpalInputStream {
            stream: Some(stream),
            pipeline,
        }))
    }
}

/// Downmix and rate conversion between the device callback and the session.
struct InputPipeline {
    resampler: Option<Resampler>,
    on_buffer: FrameCallback,
    mono: Vec<f32>,
}

impl InputPipeline {
    fn deliver(&mut self, data: &[f32], channels: usize) {
        self.mono.clear();
        if channels == 1 {
            self.mono.extend_from_slice(data);
        } else {
            self.mono.extend(
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );
        }

        match self.resampler.as_mut() {
            Some(r) => match r.process(&self.mono) {
                Ok(out) if !out.is_empty() => (self.on_buffer)(&out),
                Ok(_) => {}
                Err(e) => trace!(error = ?e, "Dropped input buffer"),
            },
            None => (self.on_buffer)(&self.mono),
        }
    }

    /// Hand the resampler's buffered tail to the session.
    fn flush(&mut self) {
        let Some(resampler) = self.resampler.as_mut() else {
            return;
        };
        match resampler.flush() {
            Ok(tail) if !tail.is_empty() => {
                debug!(samples = tail.len(), "Delivering resampled tail");
                (self.on_buffer)(&tail);
            }
            Ok(_) => {}
            Err(e) => error!(error = ?e, "Failed to flush input resampler"),
        }
    }
}

struct CpalInputStream {
    stream: Option<Stream>,
    pipeline: Arc<Mutex<InputPipeline>>,
}

impl InputStream for CpalInputStream {
    #[track_caller]
    fn start(&mut self) -> CoreResult<()> {
        let stream = self.stream.as_ref().ok_or(MemoError::DeviceError {
            reason: "Input stream already released".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        stream.play().map_err(|e| MemoError::DeviceError {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("Audio capture started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!(error = %e, "Pause before release failed");
            }
            drop(stream);
            // Most backends join the audio thread in drop(); the short yield
            // covers those that return before the final callback completes.
            std::thread::sleep(Duration::from_millis(5));

            self.pipeline
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .flush();
            info!("Audio capture stopped");
        }
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        self.stop();
    }
}
