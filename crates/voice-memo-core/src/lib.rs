//! Voice-memo Core Library
//!
//! Recording and playback sessions plus a persisted catalog of recordings,
//! built on CPAL, Rubato and Hound.
//!
//! # Example
//!
//! ```no_run
//! use voice_memo_core::{
//!     AudioFormat, CaptureSession, CoreResult, CpalInputDevice, CpalOutputDevice, JsonFileStore,
//!     MetadataCatalog, PlaybackSession, RecordingController, WavEncoder, event_channel,
//! };
//!
//! use std::{path::PathBuf, thread::sleep, time::Duration};
//!
//! fn main() -> CoreResult<()> {
//!     let dir = PathBuf::from("recordings");
//!     let (events_tx, _events_rx) = event_channel();
//!
//!     let capture = CaptureSession::new(
//!         Box::new(CpalInputDevice::new()),
//!         Box::new(WavEncoder::new()),
//!         &dir,
//!         AudioFormat::default(),
//!     );
//!     let playback = PlaybackSession::new(Box::new(CpalOutputDevice::new()));
//!     let catalog = MetadataCatalog::load(Box::new(JsonFileStore::new(dir.join("recordings.json"))), &dir);
//!
//!     let mut controller = RecordingController::new(capture, playback, catalog, events_tx);
//!     controller.handle_event(voice_memo_core::ControlEvent::PermissionResolved { granted: true });
//!
//!     controller.start_recording()?;
//!     sleep(Duration::from_secs(3));
//!     if let Some(record) = controller.stop_recording()? {
//!         println!("Saved {} ({})", record.display_name(), record.formatted_duration());
//!     }
//!     Ok(())
//! }
//! ```

mod audio;
mod catalog;
mod controller;
mod error;

pub use {
    audio::{
        AmplitudeSampler, AmplitudeStream, AudioFormat, CaptureSession, CaptureState,
        CpalInputDevice, CpalOutputDevice, EncodeSink, Encoder, FinishCallback, FrameCallback,
        InputDevice, InputStream, LEVEL_BUFFER_CAPACITY, OutputDevice, PermissionCallback,
        PlayOutcome, PlaybackHandle, PlaybackSession, Quality, RECORDING_CHANNELS,
        RECORDING_SAMPLE_RATE, TICK_PERIOD, WavEncoder, WavSink, level, read_wav,
    },
    catalog::{
        AUDIO_EXTENSION, CatalogStore, JsonFileStore, LoadReport, MetadataCatalog,
        RecordingRecord, unique_file_name,
    },
    controller::{
        ControlEvent, ControllerState, EventReceiver, EventSender, RecordingController,
        event_channel,
    },
    error::{MemoError, Result as CoreResult},
};
