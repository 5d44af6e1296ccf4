//! Collaborator seams around the platform audio stack.
//!
//! The sessions never talk to a driver or codec directly. They drive these
//! traits, which the cpal/hound adapters implement for real hardware and the
//! test fakes implement in-process.

use crate::{CoreResult, audio::AudioFormat};

use std::path::Path;

/// Receives one buffer of mono `f32` frames from the input device.
///
/// Runs on the device's real-time thread. Must not block.
pub type FrameCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// One-shot answer to a permission request.
pub type PermissionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// One-shot notification that playback reached end of file.
pub type FinishCallback = Box<dyn FnOnce() + Send + 'static>;

/// Audio input device.
pub trait InputDevice: Send {
    /// Ask for capture permission. `on_result` fires exactly once, possibly
    /// on another thread.
    fn request_permission(&mut self, on_result: PermissionCallback);

    /// Build an input stream that will deliver frames in `format` to
    /// `on_buffer` once started.
    fn open_input_stream(
        &mut self,
        format: &AudioFormat,
        on_buffer: FrameCallback,
    ) -> CoreResult<Box<dyn InputStream>>;
}

/// A built but possibly not yet running input stream.
pub trait InputStream: Send {
    /// Start delivering frames.
    fn start(&mut self) -> CoreResult<()>;

    /// Stop delivering frames. Frames still buffered inside the stream may be
    /// delivered during this call; after it returns the frame callback never
    /// fires again.
    fn stop(&mut self);
}

/// Factory for encode sinks.
pub trait Encoder: Send {
    /// Create the output file at `path` and return a sink writing to it.
    fn open(&mut self, path: &Path, format: &AudioFormat) -> CoreResult<Box<dyn EncodeSink>>;
}

/// An open encoded audio file.
pub trait EncodeSink: Send {
    /// Append one buffer of frames.
    fn write(&mut self, frames: &[f32]) -> CoreResult<()>;

    /// Finalize the file on disk.
    fn close(self: Box<Self>) -> CoreResult<()>;
}

/// Audio output device.
pub trait OutputDevice: Send {
    /// Open `path` for playback.
    fn open(&mut self, path: &Path) -> CoreResult<Box<dyn PlaybackHandle>>;
}

/// A decoded recording bound to the output device.
pub trait PlaybackHandle: Send {
    /// Start playback from the beginning. `on_finish` fires once at natural
    /// end of file and never after [`PlaybackHandle::stop`].
    fn play(&mut self, on_finish: FinishCallback) -> CoreResult<()>;

    /// Stop playback and release the device.
    fn stop(&mut self);
}
