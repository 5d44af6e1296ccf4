use crate::{
    CoreResult, MemoError,
    catalog::{AUDIO_EXTENSION, CatalogStore, PersistedRecord, RecordingRecord},
};

use std::{
    collections::{HashMap, HashSet, VecDeque},
    fs,
    io::ErrorKind,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Entries kept.
    pub loaded: usize,
    /// Entries with missing or mistyped fields.
    pub invalid: usize,
    /// Entries repeating an identifier already seen.
    pub duplicate: usize,
    /// Entries whose backing file is absent.
    pub missing_file: usize,
}

/// Persisted, newest-first list of recordings, reconciled against the
/// storage directory.
///
/// The catalog only ever publishes records whose file existed when it was
/// loaded or inserted. Every mutation is written through to the store.
pub struct MetadataCatalog {
    store: Box<dyn CatalogStore>,
    storage_dir: PathBuf,
    order: VecDeque<Uuid>,
    by_id: HashMap<Uuid, RecordingRecord>,
}

impl MetadataCatalog {
    /// Open the catalog and reconcile it against `storage_dir`.
    ///
    /// Never fails: unreadable state yields an empty catalog.
    pub fn load(store: Box<dyn CatalogStore>, storage_dir: impl AsRef<Path>) -> Self {
        let mut catalog = Self {
            store,
            storage_dir: storage_dir.as_ref().to_path_buf(),
            order: VecDeque::new(),
            by_id: HashMap::new(),
        };
        catalog.reload();
        catalog
    }

    /// Re-read the store, dropping entries that fail validation or whose
    /// file is gone.
    #[instrument(skip(self), fields(storage_dir = ?self.storage_dir))]
    pub fn reload(&mut self) -> LoadReport {
        self.order.clear();
        self.by_id.clear();

        let entries = match self.store.load() {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = ?e, "Catalog unreadable, starting empty");
                Vec::new()
            }
        };

        let mut report = LoadReport::default();

        for raw in entries {
            let record = serde_json::from_value::<PersistedRecord>(raw)
                .ok()
                .and_then(RecordingRecord::from_persisted);

            let Some(record) = record else {
                report.invalid += 1;
                continue;
            };

            if self.by_id.contains_key(&record.id()) {
                report.duplicate += 1;
                continue;
            }

            if !record.path_in(&self.storage_dir).is_file() {
                debug!(id = %record.id(), file_name = record.file_name(), "Dropping entry with missing file");
                report.missing_file += 1;
                continue;
            }

            self.order.push_back(record.id());
            self.by_id.insert(record.id(), record);
        }

        report.loaded = self.order.len();

        let orphans = self.orphaned_files();
        if !orphans.is_empty() {
            info!(count = orphans.len(), files = ?orphans, "Audio files without a catalog entry");
        }

        info!(
            loaded = report.loaded,
            invalid = report.invalid,
            duplicate = report.duplicate,
            missing_file = report.missing_file,
            "Catalog loaded"
        );

        report
    }

    /// Directory holding the audio files.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when there are no records.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Record with `id`.
    pub fn get(&self, id: Uuid) -> Option<&RecordingRecord> {
        self.by_id.get(&id)
    }

    /// Records, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &RecordingRecord> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Snapshot of the records, newest first.
    pub fn records(&self) -> Vec<RecordingRecord> {
        self.iter().cloned().collect()
    }

    /// Records whose display name contains `query`, ignoring case.
    pub fn filter(&self, query: &str) -> Vec<RecordingRecord> {
        self.iter().filter(|r| r.matches(query)).cloned().collect()
    }

    /// Absolute path of the file behind `id`.
    pub fn path_of(&self, id: Uuid) -> Option<PathBuf> {
        self.get(id).map(|r| r.path_in(&self.storage_dir))
    }

    /// Add `record` at the front and persist.
    #[instrument(skip(self, record), fields(id = %record.id()))]
    pub fn insert(&mut self, record: RecordingRecord) -> CoreResult<()> {
        let id = record.id();
        if self.by_id.insert(id, record).is_some() {
            self.order.retain(|existing| *existing != id);
        }
        self.order.push_front(id);

        info!(count = self.order.len(), "Recording added to catalog");
        self.save()
    }

    /// Remove `id` and its file, then persist.
    ///
    /// The entry is removed even if the file cannot be deleted. Returns the
    /// removed record, or `None` if there was no such entry.
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: Uuid) -> CoreResult<Option<RecordingRecord>> {
        let Some(record) = self.by_id.remove(&id) else {
            debug!("Delete of unknown recording ignored");
            return Ok(None);
        };
        self.order.retain(|existing| *existing != id);

        let path = record.path_in(&self.storage_dir);
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = ?path, "Recording file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?path, error = %e, "Failed to remove recording file"),
        }

        info!(count = self.order.len(), "Recording deleted");
        self.save()?;

        Ok(Some(record))
    }

    /// Write every record to the store, replacing what was there.
    #[track_caller]
    pub fn save(&self) -> CoreResult<()> {
        let entries = self
            .iter()
            .map(|r| serde_json::to_value(r.to_persisted()))
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|e| MemoError::CatalogCorruption {
                reason: format!("Failed to encode record: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.store.save(&entries)
    }

    /// Copy the file behind `id` to `destination`.
    ///
    /// When `destination` is an existing directory the file keeps its name
    /// inside it. The catalog and the original file are never touched.
    #[track_caller]
    #[instrument(skip(self, destination), fields(destination = ?destination.as_ref()))]
    pub fn export(&self, id: Uuid, destination: impl AsRef<Path>) -> CoreResult<PathBuf> {
        let record = self.get(id).ok_or(MemoError::RecordingNotFound {
            id,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let source = record.path_in(&self.storage_dir);
        if !source.is_file() {
            return Err(MemoError::MissingFile {
                path: source,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let destination = destination.as_ref();
        let target = if destination.is_dir() {
            destination.join(record.file_name())
        } else {
            destination.to_path_buf()
        };

        let resolved_target = resolve_target(&target)?;
        let resolved_source = fs::canonicalize(&source).map_err(|e| MemoError::ExportError {
            reason: format!("Failed to resolve {:?}: {}", source, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // The target itself may be a link back to the recording.
        let aliases_source = resolved_target == resolved_source
            || fs::canonicalize(&resolved_target).is_ok_and(|t| t == resolved_source);
        if aliases_source {
            return Err(MemoError::ExportError {
                reason: "Destination is the recording itself".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Copy beside the target and rename into place, so a failed copy
        // never leaves a truncated file under the final name.
        let partial = partial_path(&resolved_target);
        if let Err(e) = fs::copy(&source, &partial) {
            discard_partial(&partial);
            return Err(MemoError::ExportError {
                reason: format!("Failed to copy to {:?}: {}", target, e),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Err(e) = fs::rename(&partial, &resolved_target) {
            discard_partial(&partial);
            return Err(MemoError::ExportError {
                reason: format!("Failed to move export into {:?}: {}", target, e),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(target = ?target, "Recording exported");

        Ok(target)
    }

    /// Audio files in the storage directory that no record references.
    pub fn orphaned_files(&self) -> Vec<String> {
        let Ok(dir) = fs::read_dir(&self.storage_dir) else {
            return Vec::new();
        };

        let known: HashSet<&str> = self.by_id.values().map(|r| r.file_name()).collect();

        let mut orphans: Vec<String> = dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(AUDIO_EXTENSION))
                    .unwrap_or(false)
            })
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .filter(|name| !known.contains(name.as_str()))
            .collect();

        orphans.sort();
        orphans
    }
}

/// `target` with its directory resolved through links and `..` components.
#[track_caller]
fn resolve_target(target: &Path) -> CoreResult<PathBuf> {
    let file_name = target.file_name().ok_or(MemoError::ExportError {
        reason: format!("Destination {:?} does not name a file", target),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let parent = fs::canonicalize(parent).map_err(|e| MemoError::ExportError {
        reason: format!("Destination directory {:?} is not usable: {}", parent, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(parent.join(file_name))
}

fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4().simple()))
}

fn discard_partial(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => debug!(path = ?partial, "Removed partial export"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?partial, error = %e, "Failed to remove partial export"),
    }
}
