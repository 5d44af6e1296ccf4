mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod logging_config;
mod storage_config;

pub(crate) use {
    audio_config::AudioConfig, config::Config, logging_config::LoggingConfig,
    storage_config::StorageConfig,
};

pub(crate) const DEFAULT_LOG_FILTER: &str = "voice_memo=info,voice_memo_core=info";
pub(crate) const DEFAULT_CATALOG_FILE: &str = "recordings.json";
pub(crate) const RECORDINGS_DIR_NAME: &str = "recordings";
pub(crate) const LOGS_DIR_NAME: &str = "logs";

pub(crate) fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
