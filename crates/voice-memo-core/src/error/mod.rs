use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;
use uuid::Uuid;

/// Recorder errors with source location tracking.
#[derive(Error, Debug)]
pub enum MemoError {
    /// Microphone access has not been granted.
    #[error("Microphone permission denied {location}")]
    PermissionDenied {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The shared audio device is held by the other session kind.
    #[error("Audio device busy: {reason} {location}")]
    DeviceBusy {
        /// Which session currently holds the device.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Input or output device failed to open or start.
    #[error("Audio device error: {reason} {location}")]
    DeviceError {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A single buffer could not be written to the encode sink.
    #[error("Encode write failed: {reason} {location}")]
    EncodeWriteError {
        /// Description of the write failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Closing the encode sink failed; the recording is discarded.
    #[error("Failed to finalize recording: {reason} {location}")]
    FinalizeError {
        /// Description of the finalize failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Persisted catalog state could not be read or parsed.
    #[error("Catalog corrupted: {reason} {location}")]
    CatalogCorruption {
        /// Description of the corruption.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording's backing file is absent.
    #[error("Recording file missing: {path:?} {location}")]
    MissingFile {
        /// Path that was expected to exist.
        path: PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No catalog entry has the requested identifier.
    #[error("Recording not found: {id} {location}")]
    RecordingNotFound {
        /// The identifier that was looked up.
        id: Uuid,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Copying a recording to its export destination failed.
    #[error("Export failed: {reason} {location}")]
    ExportError {
        /// Description of the export failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl MemoError {
    /// Short message suitable for the user-visible error slot.
    pub fn user_message(&self) -> String {
        match self {
            MemoError::PermissionDenied { .. } => "Microphone access is not granted".to_string(),
            MemoError::DeviceBusy { reason, .. } => reason.clone(),
            MemoError::DeviceError { reason, .. } => format!("Audio device error: {}", reason),
            MemoError::EncodeWriteError { reason, .. } => format!("Write failed: {}", reason),
            MemoError::FinalizeError { .. } => "Failed to save recording".to_string(),
            MemoError::CatalogCorruption { .. } => "Recording list could not be read".to_string(),
            MemoError::MissingFile { .. } => "Failed to play: file is missing".to_string(),
            MemoError::RecordingNotFound { .. } => "Recording no longer exists".to_string(),
            MemoError::ExportError { reason, .. } => format!("Export failed: {}", reason),
            MemoError::ResamplingError { reason, .. } => format!("Audio conversion failed: {}", reason),
            MemoError::Io { source, .. } => format!("Storage error: {}", source),
        }
    }
}

// Manual From<io::Error> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<std::io::Error> for MemoError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        MemoError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`MemoError`].
pub type Result<T> = std::result::Result<T, MemoError>;
