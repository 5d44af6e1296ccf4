use crate::{
    CoreResult, MemoError,
    audio::{
        AmplitudeSampler, AmplitudeStream, AudioFormat, EncodeSink, Encoder, FrameCallback,
        InputDevice, InputStream, TICK_PERIOD, Ticker,
    },
    catalog::{RecordingRecord, unique_file_name},
};

use std::{
    fs,
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::Utc;
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

type SinkSlot = Arc<Mutex<Option<Box<dyn EncodeSink>>>>;

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Nothing acquired.
    Idle,
    /// Acquiring device, file and callback.
    Starting,
    /// Frames are flowing into the encode sink.
    Active,
    /// Releasing resources and finalizing the file.
    Stopping,
    /// Setup failed; resources are being released.
    Failed,
}

/// Owns the input stream, the live encode sink and duration tracking for one
/// recording at a time.
///
/// All methods run on the control plane. The only code that runs elsewhere is
/// the frame callback handed to the input device, which touches nothing but
/// the per-session sink slot, the shutdown flag and the sampler.
pub struct CaptureSession {
    input: Box<dyn InputDevice>,
    encoder: Box<dyn Encoder>,
    storage_dir: PathBuf,
    format: AudioFormat,
    state: CaptureState,
    session_id: Option<Uuid>,
    file_name: Option<String>,
    started_at: Option<Instant>,
    stream: Option<Box<dyn InputStream>>,
    sink: Option<SinkSlot>,
    /// Set before the stream is released so a callback already in flight
    /// returns without touching the sink.
    shutdown: Arc<AtomicBool>,
    write_failures: Arc<AtomicU64>,
    sampler: Option<Arc<AmplitudeSampler>>,
    ticker: Option<Ticker>,
}

impl CaptureSession {
    /// Create an idle session writing into `storage_dir`.
    pub fn new(
        input: Box<dyn InputDevice>,
        encoder: Box<dyn Encoder>,
        storage_dir: impl AsRef<Path>,
        format: AudioFormat,
    ) -> Self {
        Self {
            input,
            encoder,
            storage_dir: storage_dir.as_ref().to_path_buf(),
            format,
            state: CaptureState::Idle,
            session_id: None,
            file_name: None,
            started_at: None,
            stream: None,
            sink: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            write_failures: Arc::new(AtomicU64::new(0)),
            sampler: None,
            ticker: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// True while frames are being recorded.
    pub fn is_active(&self) -> bool {
        self.state == CaptureState::Active
    }

    /// Identifier of the running session, which becomes the record id.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Time since the stream started, zero when idle.
    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Attach a level observer to the running session.
    pub fn subscribe_amplitude(&self) -> Option<AmplitudeStream> {
        self.sampler.as_ref().map(|s| s.subscribe())
    }

    /// Access to the input device, e.g. for permission requests.
    pub fn input_mut(&mut self) -> &mut dyn InputDevice {
        self.input.as_mut()
    }

    /// Begin recording into a fresh file.
    ///
    /// No-op unless idle. On any setup failure everything acquired so far is
    /// released, the session returns to idle and the error is returned.
    /// `on_tick` runs every [`TICK_PERIOD`] with the elapsed time until stop.
    #[track_caller]
    #[instrument(skip(self, on_tick))]
    pub fn start<F>(&mut self, session_id: Uuid, permission_granted: bool, on_tick: F) -> CoreResult<()>
    where
        F: FnMut(Duration) + Send + 'static,
    {
        if self.state != CaptureState::Idle {
            debug!(state = ?self.state, "start ignored, capture not idle");
            return Ok(());
        }

        self.state = CaptureState::Starting;
        self.session_id = Some(session_id);

        match self.acquire(permission_granted, on_tick) {
            Ok(()) => {
                self.state = CaptureState::Active;
                info!(
                    session_id = %session_id,
                    file_name = ?self.file_name,
                    "Capture started"
                );
                Ok(())
            }
            Err(e) => {
                self.state = CaptureState::Failed;
                warn!(session_id = %session_id, error = ?e, "Capture setup failed");

                let file_name = self.file_name.clone();
                if let Err(close_err) = self.release() {
                    debug!(error = ?close_err, "Partial file did not finalize");
                }
                if let Some(name) = file_name {
                    self.discard_file(&name);
                }

                self.state = CaptureState::Idle;
                Err(e)
            }
        }
    }

    /// Stop recording and finalize the file.
    ///
    /// Returns the completed record, or `None` when there was nothing to stop.
    /// A finalize failure discards the file and returns the error; the session
    /// is idle either way.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> CoreResult<Option<RecordingRecord>> {
        if self.state != CaptureState::Active {
            debug!(state = ?self.state, "stop ignored, capture not active");
            return Ok(None);
        }

        self.state = CaptureState::Stopping;

        let session_id = self.session_id;
        let file_name = self.file_name.clone();
        let started_at = self.started_at;

        let finalized = self.release();
        self.state = CaptureState::Idle;

        let duration = started_at.map(|t| t.elapsed());

        match finalized {
            Err(e) => {
                error!(session_id = ?session_id, error = ?e, "Recording discarded");
                if let Some(name) = file_name {
                    self.discard_file(&name);
                }
                Err(e)
            }
            Ok(false) => Ok(None),
            Ok(true) => match (session_id, file_name, duration) {
                (Some(id), Some(name), Some(duration)) => {
                    let record =
                        RecordingRecord::new(id, name, Utc::now(), duration.as_secs_f64());
                    info!(
                        session_id = %id,
                        duration_ms = duration.as_millis(),
                        "Capture stopped"
                    );
                    Ok(Some(record))
                }
                _ => Ok(None),
            },
        }
    }

    #[track_caller]
    fn acquire<F>(&mut self, permission_granted: bool, mut on_tick: F) -> CoreResult<()>
    where
        F: FnMut(Duration) + Send + 'static,
    {
        if !permission_granted {
            return Err(MemoError::PermissionDenied {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        fs::create_dir_all(&self.storage_dir)?;
        let file_name = unique_file_name(&self.storage_dir, Utc::now());
        let path = self.storage_dir.join(&file_name);

        let sink = self.encoder.open(&path, &self.format)?;
        self.file_name = Some(file_name);

        let slot: SinkSlot = Arc::new(Mutex::new(Some(sink)));
        self.sink = Some(Arc::clone(&slot));

        // Fresh flags per session so a stale callback can never see a reset.
        let shutdown = Arc::new(AtomicBool::new(false));
        let write_failures = Arc::new(AtomicU64::new(0));
        let sampler = Arc::new(AmplitudeSampler::new());
        self.shutdown = Arc::clone(&shutdown);
        self.write_failures = Arc::clone(&write_failures);
        self.sampler = Some(Arc::clone(&sampler));

        let on_buffer: FrameCallback = Box::new(move |frames: &[f32]| {
            if shutdown.load(Ordering::Acquire) {
                return;
            }

            {
                let mut guard = slot.lock().unwrap_or_else(|e| {
                    error!("Encode sink lock poisoned, recovering: {}", e);
                    e.into_inner()
                });
                if let Some(sink) = guard.as_mut() {
                    // Best-effort: a failed buffer is counted and skipped.
                    if sink.write(frames).is_err() {
                        write_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            sampler.observe(frames);
        });

        let stream = self.input.open_input_stream(&self.format, on_buffer)?;
        let stream = self.stream.insert(stream);
        stream.start()?;

        let started_at = Instant::now();
        self.started_at = Some(started_at);

        let ticker = Ticker::spawn("duration-tick", TICK_PERIOD, move || {
            on_tick(started_at.elapsed());
        })?;
        self.ticker = Some(ticker);

        Ok(())
    }

    /// Release whatever is held, in callback-safe order.
    ///
    /// Returns `Ok(true)` if a sink was finalized, `Ok(false)` if none was open.
    fn release(&mut self) -> CoreResult<bool> {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }

        // The stream may hand over buffered frames while stopping, so the
        // callback stays open until it returns.
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            drop(stream);
        }

        self.shutdown.store(true, Ordering::Release);

        // The stream held the callback's sampler clone; dropping ours closes
        // every observer's sequence.
        self.sampler = None;

        let sink = match self.sink.take() {
            Some(slot) => {
                let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
                guard.take()
            }
            None => None,
        };

        let failures = self.write_failures.swap(0, Ordering::Relaxed);
        if failures > 0 {
            warn!(failures, "Some buffers failed to encode and were skipped");
        }

        self.session_id = None;
        self.file_name = None;
        self.started_at = None;

        match sink {
            Some(sink) => {
                sink.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn discard_file(&self, file_name: &str) {
        let path = self.storage_dir.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = ?path, "Discarded partial recording"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?path, error = %e, "Failed to remove partial recording"),
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.state != CaptureState::Idle {
            if let Err(e) = self.release() {
                error!(error = ?e, "Failed to finalize recording on drop");
            }
        }
    }
}
