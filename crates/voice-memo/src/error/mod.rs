use voice_memo_core::MemoError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the voice-memo binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Recording, playback or catalog error from voice-memo-core.
    #[error("Core error: {source} {location}")]
    Core {
        /// The underlying core error.
        #[source]
        source: MemoError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// A console line could not be understood.
    #[error("Invalid command {input:?}: {reason} {location}")]
    CommandParse {
        /// The line as typed.
        input: String,
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// A list position or id did not name a recording.
    #[error("No such recording: {reference} {location}")]
    UnknownRecording {
        /// The reference as typed.
        reference: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Failed to send message through async channel.
    #[error("Channel send failed: {message} {location}")]
    ChannelSendFailed {
        /// Human-readable error message.
        message: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or saving error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

impl AppError {
    /// Short message for the console.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Core { source, .. } => source.user_message(),
            AppError::CommandParse { reason, .. } => reason.clone(),
            AppError::UnknownRecording { reference, .. } => {
                format!("No recording matches {:?}", reference)
            }
            AppError::ChannelSendFailed { message, .. } => message.clone(),
            AppError::ConfigError { reason, .. } => reason.clone(),
            AppError::IoError { source, .. } => source.to_string(),
        }
    }
}

// Manual From<MemoError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<MemoError> for AppError {
    #[track_caller]
    fn from(source: MemoError) -> Self {
        AppError::Core {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
