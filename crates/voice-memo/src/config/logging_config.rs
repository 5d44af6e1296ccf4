use crate::config::default_log_filter;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives. `RUST_LOG` overrides this when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Directory receiving the daily rolling log files.
    pub log_dir: PathBuf,
}
