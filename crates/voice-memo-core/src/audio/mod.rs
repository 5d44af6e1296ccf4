pub(crate) mod capture;
mod cpal_input;
mod cpal_output;
mod device;
mod format;
pub(crate) mod playback;
mod resampler;
pub(crate) mod sampler;
mod ticker;
mod wav;

pub(crate) use {resampler::Resampler, ticker::Ticker};

pub use {
    capture::{CaptureSession, CaptureState},
    cpal_input::CpalInputDevice,
    cpal_output::CpalOutputDevice,
    device::{
        EncodeSink, Encoder, FinishCallback, FrameCallback, InputDevice, InputStream,
        OutputDevice, PermissionCallback, PlaybackHandle,
    },
    format::{AudioFormat, Quality, RECORDING_CHANNELS, RECORDING_SAMPLE_RATE},
    playback::{PlayOutcome, PlaybackSession},
    sampler::{AmplitudeSampler, AmplitudeStream, LEVEL_BUFFER_CAPACITY, level},
    ticker::TICK_PERIOD,
    wav::{WavEncoder, WavSink, read_wav},
};
