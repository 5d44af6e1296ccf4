//! Tracing setup: daily rolling log file under the configured directory.
//!
//! The console is interactive, so log output goes to a file only.

use crate::{AppError, AppResult, config::LoggingConfig};

use std::{fs, panic::Location};

use error_location::ErrorLocation;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "voice-memo.log";

/// Install the global subscriber. `RUST_LOG` overrides the configured filter.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the background writer.
#[track_caller]
pub(crate) fn init(config: &LoggingConfig) -> AppResult<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| AppError::ConfigError {
            reason: format!("Invalid log filter {:?}: {}", config.filter, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| AppError::ConfigError {
            reason: format!("Failed to install log subscriber: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(guard)
}
