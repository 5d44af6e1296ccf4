#[allow(clippy::module_inception)]
mod catalog;
mod naming;
mod record;
mod store;

pub(crate) use record::PersistedRecord;

pub use {
    catalog::{LoadReport, MetadataCatalog},
    naming::{AUDIO_EXTENSION, unique_file_name},
    record::RecordingRecord,
    store::{CatalogStore, JsonFileStore},
};
