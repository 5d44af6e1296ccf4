use crate::{CoreResult, MemoError};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Where the catalog's raw entries live between runs.
///
/// Entries are untyped on purpose: validating them is the catalog's job, so a
/// store only has to hand back whatever sequence it last saved.
pub trait CatalogStore: Send {
    /// Read the saved entries. `Ok(None)` when nothing was ever saved.
    fn load(&self) -> CoreResult<Option<Vec<Value>>>;

    /// Replace the saved entries.
    fn save(&self, entries: &[Value]) -> CoreResult<()>;
}

/// Catalog persisted as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`. The file is created on first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonFileStore {
    #[track_caller]
    #[instrument(skip(self), fields(path = ?self.path))]
    fn load(&self) -> CoreResult<Option<Vec<Value>>> {
        if !self.path.exists() {
            debug!("No catalog file yet");
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;

        let entries: Vec<Value> =
            serde_json::from_str(&contents).map_err(|e| MemoError::CatalogCorruption {
                reason: format!("Failed to parse catalog: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Some(entries))
    }

    /// Writes to a temporary file first, then renames, so a crash mid-write
    /// leaves the previous catalog intact.
    #[track_caller]
    #[instrument(skip(self, entries), fields(path = ?self.path, count = entries.len()))]
    fn save(&self, entries: &[Value]) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(entries).map_err(|e| {
            MemoError::CatalogCorruption {
                reason: format!("Failed to serialize catalog: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let temp_path = self.path.with_extension("json.tmp");

        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(contents.as_bytes())?;
        temp_file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        info!("Catalog saved (atomic write)");

        Ok(())
    }
}
