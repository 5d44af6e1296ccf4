//! Control-plane orchestration of capture, playback and the catalog.
//!
//! [`RecordingController`] is owned by exactly one task. Every transition runs
//! through `&mut self`, so no two can interleave. Work that happens elsewhere
//! (permission answers, duration ticks, end-of-file notifications) is posted
//! back as a [`ControlEvent`] over a non-blocking channel and applied with
//! [`RecordingController::handle_event`] on the owning task.

use crate::{
    CoreResult, MemoError,
    audio::{AmplitudeStream, CaptureSession, FinishCallback, PlayOutcome, PlaybackSession},
    catalog::{MetadataCatalog, RecordingRecord},
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Work completed off the control plane, delivered back to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// The input device answered a permission request.
    PermissionResolved {
        /// Whether capture is allowed.
        granted: bool,
    },
    /// Periodic duration update from a running capture.
    DurationTick {
        /// Capture session the tick belongs to.
        session_id: Uuid,
        /// Time since the capture started.
        elapsed: Duration,
    },
    /// A playback reached the end of its file.
    PlaybackFinished {
        /// Token returned when that playback started.
        token: Uuid,
    },
}

/// Sending half of the control-plane inbox.
pub type EventSender = mpsc::UnboundedSender<ControlEvent>;

/// Receiving half of the control-plane inbox.
pub type EventReceiver = mpsc::UnboundedReceiver<ControlEvent>;

/// Create the control-plane inbox.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Everything the UI observes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    /// A capture is running.
    pub is_recording: bool,
    /// Record currently playing.
    pub playing: Option<Uuid>,
    /// Advisory elapsed time of the running capture.
    pub current_duration: Duration,
    /// Catalog, newest first.
    pub recordings: Vec<RecordingRecord>,
    /// Whether capture permission has been granted.
    pub permission_granted: bool,
    /// Most recent user-visible error, until dismissed.
    pub last_error: Option<String>,
}

impl ControllerState {
    /// True if `id` is the record playing.
    pub fn is_playing(&self, id: Uuid) -> bool {
        self.playing == Some(id)
    }
}

/// Single source of truth for recording, playback and the catalog.
pub struct RecordingController {
    capture: CaptureSession,
    playback: PlaybackSession,
    catalog: MetadataCatalog,
    events_tx: EventSender,
    state_tx: watch::Sender<ControllerState>,
    permission_granted: bool,
    last_error: Option<String>,
}

impl RecordingController {
    /// Assemble a controller. Events posted on `events_tx` must be fed back
    /// through [`RecordingController::handle_event`].
    pub fn new(
        capture: CaptureSession,
        playback: PlaybackSession,
        catalog: MetadataCatalog,
        events_tx: EventSender,
    ) -> Self {
        let (state_tx, _) = watch::channel(ControllerState::default());
        let controller = Self {
            capture,
            playback,
            catalog,
            events_tx,
            state_tx,
            permission_granted: false,
            last_error: None,
        };
        controller.publish();
        controller
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state_tx.subscribe()
    }

    /// Latest published state.
    pub fn state(&self) -> ControllerState {
        self.state_tx.borrow().clone()
    }

    /// The catalog, for queries.
    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    /// Level stream of the running capture. `None` when not recording.
    pub fn amplitude(&self) -> Option<AmplitudeStream> {
        self.capture.subscribe_amplitude()
    }

    /// Records whose display name contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<RecordingRecord> {
        self.catalog.filter(query)
    }

    /// Ask the input device for capture permission. The answer arrives as
    /// [`ControlEvent::PermissionResolved`].
    #[instrument(skip(self))]
    pub fn request_permission(&mut self) {
        let tx = self.events_tx.clone();
        self.capture
            .input_mut()
            .request_permission(Box::new(move |granted| {
                if tx.send(ControlEvent::PermissionResolved { granted }).is_err() {
                    debug!("Permission answer arrived after shutdown");
                }
            }));
    }

    /// Start a new recording.
    ///
    /// Refused while playback holds the device. No-op while already recording.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start_recording(&mut self) -> CoreResult<()> {
        if self.capture.is_active() {
            debug!("Already recording");
            return Ok(());
        }

        if self.playback.is_playing() {
            return Err(self.fail(MemoError::DeviceBusy {
                reason: "Stop playback before recording".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }));
        }

        let session_id = Uuid::new_v4();
        let tx = self.events_tx.clone();
        let on_tick = move |elapsed: Duration| {
            // Err only after the control plane is gone.
            let _ = tx.send(ControlEvent::DurationTick {
                session_id,
                elapsed,
            });
        };

        match self
            .capture
            .start(session_id, self.permission_granted, on_tick)
        {
            Ok(()) => {
                info!(session_id = %session_id, "Recording started");
                self.publish();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Stop the running recording and add it to the catalog.
    ///
    /// Returns the new record, or `None` if nothing was recording.
    #[instrument(skip(self))]
    pub fn stop_recording(&mut self) -> CoreResult<Option<RecordingRecord>> {
        let record = match self.capture.stop() {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.publish();
                return Err(self.fail(e));
            }
        };

        let result = self.catalog.insert(record.clone());
        self.publish();

        match result {
            Ok(()) => {
                info!(
                    id = %record.id(),
                    duration_s = record.duration_seconds(),
                    "Recording saved"
                );
                Ok(Some(record))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Play `id`, or stop it if it is already playing.
    ///
    /// Any other playback is stopped first. Refused while recording.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn play(&mut self, id: Uuid) -> CoreResult<PlayOutcome> {
        if self.capture.is_active() {
            return Err(self.fail(MemoError::DeviceBusy {
                reason: "Stop recording before playing".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }));
        }

        let Some(path) = self.catalog.path_of(id) else {
            return Err(self.fail(MemoError::RecordingNotFound {
                id,
                location: ErrorLocation::from(Location::caller()),
            }));
        };

        let tx = self.events_tx.clone();
        let on_finish = move |token: Uuid| -> FinishCallback {
            Box::new(move || {
                let _ = tx.send(ControlEvent::PlaybackFinished { token });
            })
        };

        let result = self.playback.play(id, &path, on_finish);
        self.publish();

        result.map_err(|e| self.fail(e))
    }

    /// Stop playback if any. Idempotent.
    #[instrument(skip(self))]
    pub fn stop_playback(&mut self) {
        if self.playback.stop().is_some() {
            self.publish();
        }
    }

    /// Delete `id` and its file. Stops it first if it is playing.
    #[instrument(skip(self))]
    pub fn delete_recording(&mut self, id: Uuid) -> CoreResult<()> {
        if self.playback.playing_id() == Some(id) {
            self.playback.stop();
        }

        let result = self.catalog.delete(id);
        self.publish();

        match result {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(self.fail(MemoError::RecordingNotFound {
                id,
                location: ErrorLocation::from(Location::caller()),
            })),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Copy the file behind `id` to `destination`.
    #[instrument(skip(self, destination))]
    pub fn export_recording(&mut self, id: Uuid, destination: &Path) -> CoreResult<PathBuf> {
        self.catalog.export(id, destination).map_err(|e| self.fail(e))
    }

    /// Dismiss the user-visible error.
    pub fn clear_error(&mut self) {
        if self.last_error.take().is_some() {
            self.publish();
        }
    }

    /// Apply work posted from another thread.
    #[instrument(skip(self))]
    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::PermissionResolved { granted } => {
                self.permission_granted = granted;
                if !granted {
                    warn!("Capture permission denied");
                }
                self.publish();
            }
            ControlEvent::DurationTick {
                session_id,
                elapsed,
            } => {
                // Ticks queued before a stop are stale once it returns.
                if self.capture.session_id() == Some(session_id) && self.capture.is_active() {
                    self.state_tx
                        .send_modify(|state| state.current_duration = elapsed);
                }
            }
            ControlEvent::PlaybackFinished { token } => {
                if self.playback.finish(token).is_some() {
                    self.publish();
                }
            }
        }
    }

    /// Stop everything, keeping an in-progress recording.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) {
        self.stop_playback();
        if let Err(e) = self.stop_recording() {
            error!(error = ?e, "Recording lost during shutdown");
        }
    }

    fn fail(&mut self, error: MemoError) -> MemoError {
        warn!(error = ?error, "Operation failed");
        self.last_error = Some(error.user_message());
        self.publish();
        error
    }

    fn publish(&self) {
        let snapshot = ControllerState {
            is_recording: self.capture.is_active(),
            playing: self.playback.playing_id(),
            current_duration: self.capture.elapsed(),
            recordings: self.catalog.records(),
            permission_granted: self.permission_granted,
            last_error: self.last_error.clone(),
        };
        self.state_tx.send_replace(snapshot);
    }
}
