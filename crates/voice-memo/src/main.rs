//! Voice-Memo: record, play back and manage voice memos from the console.

mod app;
mod app_command;
mod config;
mod console;
mod error;
mod logging;

pub(crate) use {
    app::App,
    app_command::{AppCommand, RecordingRef},
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use std::{
    io::{self, BufRead},
    panic::Location,
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::mpsc;
use tracing::{error, info};
use voice_memo_core::{
    CaptureSession, CpalInputDevice, CpalOutputDevice, JsonFileStore, MetadataCatalog,
    PlaybackSession, RecordingController, WavEncoder, event_channel,
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Application entry point.
fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Dropping the guard flushes the log writer.
    let _log_guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        recordings_dir = ?config.storage.recordings_dir,
        quality = ?config.audio.quality,
        "Configuration ready"
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let result = rt.block_on(run(config));

    // The console reader may still be parked on stdin.
    rt.shutdown_timeout(SHUTDOWN_TIMEOUT);

    if let Err(e) = result {
        error!(error = ?e, "App error");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

/// Wire the devices, catalog and controller together and run the console.
async fn run(config: Config) -> AppResult<()> {
    let storage = &config.storage;
    let (events_tx, events_rx) = event_channel();

    let capture = CaptureSession::new(
        Box::new(CpalInputDevice::new()),
        Box::new(WavEncoder::new()),
        &storage.recordings_dir,
        config.audio.format(),
    );
    let playback = PlaybackSession::new(Box::new(CpalOutputDevice::new()));
    let catalog = MetadataCatalog::load(
        Box::new(JsonFileStore::new(&storage.catalog_file)),
        &storage.recordings_dir,
    );
    let controller = RecordingController::new(capture, playback, catalog, events_tx);

    // Console line forwarding via a single blocking task.
    //
    // Shutdown: when lines_rx is dropped (main loop breaks), the next
    // blocking_send() fails and the reader exits.
    let (lines_tx, lines_rx) = mpsc::channel(32);
    let reader = tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if lines_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("{}", console::HELP);
    let outcome = App::new(controller, events_rx, lines_rx).run().await;

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, reader).await {
        Ok(Ok(())) => info!("Console reader stopped cleanly"),
        Ok(Err(e)) => {
            return Err(AppError::ChannelSendFailed {
                message: format!("Console reader task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Err(_) => info!("Console reader still waiting on input, will be cleaned up on exit"),
    }

    outcome
}
