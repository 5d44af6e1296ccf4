use crate::{CoreResult, MemoError};

use std::{
    panic::Location,
    sync::mpsc::{self, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::Duration,
};

use error_location::ErrorLocation;
use tracing::{debug, warn};

/// Period of the advisory duration tick.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// A repeating task on its own thread, bound to its owner's lifetime.
///
/// [`Ticker::cancel`] joins the thread, so once it returns `on_tick` will not
/// run again. Dropping the ticker cancels it.
pub(crate) struct Ticker {
    cancel_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    #[track_caller]
    pub(crate) fn spawn<F>(name: &str, period: Duration, mut on_tick: F) -> CoreResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    match cancel_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => on_tick(),
                        // Explicit cancel or the owner vanished.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| MemoError::DeviceError {
                reason: format!("Failed to spawn {} thread: {}", name, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!(ticker = name, period_ms = period.as_millis(), "Ticker started");

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    /// Stop ticking and wait for the tick thread to exit. Idempotent.
    pub(crate) fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            // The thread may already be gone; dropping tx also wakes it.
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}
