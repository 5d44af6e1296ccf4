use crate::{
    CoreResult, MemoError,
    audio::{FinishCallback, OutputDevice, PlaybackHandle},
};

use std::{panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// What a [`PlaybackSession::play`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback of the requested record began.
    Started {
        /// Token identifying this playback for completion matching.
        token: Uuid,
    },
    /// The requested record was already playing and has been stopped.
    Stopped,
}

struct ActivePlayback {
    record_id: Uuid,
    token: Uuid,
    handle: Box<dyn PlaybackHandle>,
}

/// Plays at most one recording at a time.
pub struct PlaybackSession {
    output: Box<dyn OutputDevice>,
    current: Option<ActivePlayback>,
}

impl PlaybackSession {
    /// Create a stopped session on `output`.
    pub fn new(output: Box<dyn OutputDevice>) -> Self {
        Self {
            output,
            current: None,
        }
    }

    /// Record currently playing, if any.
    pub fn playing_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|c| c.record_id)
    }

    /// True while any record is playing.
    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// Toggle-or-start playback of `record_id` from `path`.
    ///
    /// Asking for the record that is already playing stops it. Anything else
    /// stops the current playback first. `on_finish` is built from the token
    /// so a late completion from an older playback can be told apart.
    #[track_caller]
    #[instrument(skip(self, path, on_finish))]
    pub fn play<F>(&mut self, record_id: Uuid, path: &Path, on_finish: F) -> CoreResult<PlayOutcome>
    where
        F: FnOnce(Uuid) -> FinishCallback,
    {
        if self.playing_id() == Some(record_id) {
            self.stop();
            return Ok(PlayOutcome::Stopped);
        }

        self.stop();

        if !path.exists() {
            return Err(MemoError::MissingFile {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut handle = self.output.open(path)?;
        let token = Uuid::new_v4();

        if let Err(e) = handle.play(on_finish(token)) {
            handle.stop();
            return Err(e);
        }

        self.current = Some(ActivePlayback {
            record_id,
            token,
            handle,
        });

        info!(record_id = %record_id, token = %token, "Playback started");

        Ok(PlayOutcome::Started { token })
    }

    /// Stop playback and release the output handle. Idempotent.
    ///
    /// Returns the record that was playing.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> Option<Uuid> {
        let mut active = self.current.take()?;
        active.handle.stop();
        info!(record_id = %active.record_id, "Playback stopped");
        Some(active.record_id)
    }

    /// Handle a natural end-of-file signal for the playback with `token`.
    ///
    /// Stale tokens (from a playback already stopped or replaced) are ignored.
    pub fn finish(&mut self, token: Uuid) -> Option<Uuid> {
        let is_current = self.current.as_ref().is_some_and(|a| a.token == token);
        if !is_current {
            debug!(token = %token, "Ignoring completion from a stale playback");
            return None;
        }

        let finished = self.stop();
        debug!(record_id = ?finished, "Playback reached end of file");
        finished
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop();
    }
}
