use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where recordings and their catalog live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the audio files.
    pub recordings_dir: PathBuf,

    /// JSON catalog file.
    pub catalog_file: PathBuf,
}
