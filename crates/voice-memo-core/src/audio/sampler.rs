use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::trace;

/// Levels buffered per observer before the oldest are dropped.
///
/// At ~23ms per buffer this is a little under two seconds of history, enough
/// for a UI frame hitch without growing memory.
pub const LEVEL_BUFFER_CAPACITY: usize = 64;

/// Derives a bounded level from raw frames for visualization.
///
/// Levels go out on a bounded broadcast channel that drops the oldest value
/// for slow observers, so the encode path never waits here. The sequence ends
/// when the sampler (and every clone of its sender) is dropped, which happens
/// when the capture stream that owns it is torn down.
pub struct AmplitudeSampler {
    tx: broadcast::Sender<f32>,
}

impl AmplitudeSampler {
    /// Create a sampler with [`LEVEL_BUFFER_CAPACITY`] slots per observer.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(LEVEL_BUFFER_CAPACITY);
        Self { tx }
    }

    /// Publish the level of one buffer. No-op when nobody is listening.
    pub fn observe(&self, frames: &[f32]) {
        if self.tx.receiver_count() == 0 {
            return;
        }

        let level = level(frames);
        // Err only means every receiver went away since the check above.
        if self.tx.send(level).is_err() {
            trace!("Level dropped, no observers");
        }
    }

    /// Attach a new observer. It sees levels published from now on.
    pub fn subscribe(&self) -> AmplitudeStream {
        AmplitudeStream {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AmplitudeSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy sequence of levels in `0.0..=1.0`, one per delivered buffer.
#[derive(Debug)]
pub struct AmplitudeStream {
    rx: broadcast::Receiver<f32>,
}

impl AmplitudeStream {
    /// Wait for the next level. `None` once capture has stopped.
    ///
    /// Levels the observer fell behind on are skipped.
    pub async fn next(&mut self) -> Option<f32> {
        loop {
            match self.rx.recv().await {
                Ok(level) => return Some(level),
                Err(RecvError::Lagged(skipped)) => {
                    trace!(skipped, "Amplitude observer lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered level without waiting.
    pub fn try_next(&mut self) -> Option<f32> {
        loop {
            match self.rx.try_recv() {
                Ok(level) => return Some(level),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

/// RMS of a buffer, clamped to `0.0..=1.0`. Silence for an empty buffer.
pub fn level(frames: &[f32]) -> f32 {
    if frames.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = frames.iter().map(|s| s * s).sum();
    let rms = (sum_squares / frames.len() as f32).sqrt();
    if rms.is_finite() { rms.min(1.0) } else { 0.0 }
}
