//! Settings read from the environment.

use std::env;
use std::path::PathBuf;

use lms_search_repository::config::{DEFAULT_SCROLL_KEEP_ALIVE, DEFAULT_UPLOAD_LIMIT};
use lms_search_repository::SearchConfig;

use crate::IndexingError;

/// Default directory for entity snapshots and extracted file text.
const DEFAULT_DATA_DIR: &str = "./data";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Everything the binary needs to know about its environment.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub search: SearchConfig,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
}

impl IndexerConfig {
    /// Read the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (search is disabled when unset)
    /// - `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`: Basic-auth credentials
    /// - `SEARCH_UPLOAD_LIMIT`: Largest accepted request body in bytes (default: 8000000)
    /// - `SEARCH_SCROLL_KEEP_ALIVE`: Scroll keep-alive (default: 5m)
    /// - `LMS_DATA_DIR`: Snapshot and file text directory (default: ./data)
    /// - `LOG_FORMAT`: `json` for JSON logs, anything else for pretty logs
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IndexingError> {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let upload_limit = match non_blank("SEARCH_UPLOAD_LIMIT") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                IndexingError::config(format!("Invalid SEARCH_UPLOAD_LIMIT '{}': {}", raw, e))
            })?,
            None => DEFAULT_UPLOAD_LIMIT,
        };
        if upload_limit == 0 {
            return Err(IndexingError::config("SEARCH_UPLOAD_LIMIT must be positive"));
        }

        let search = SearchConfig {
            url: non_blank("OPENSEARCH_URL"),
            username: non_blank("OPENSEARCH_USERNAME"),
            password: non_blank("OPENSEARCH_PASSWORD"),
            upload_limit,
            scroll_keep_alive: non_blank("SEARCH_SCROLL_KEEP_ALIVE")
                .unwrap_or_else(|| DEFAULT_SCROLL_KEEP_ALIVE.to_string()),
        };

        let log_format = match non_blank("LOG_FORMAT").as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            search,
            data_dir: non_blank("LMS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            log_format,
        })
    }

    /// Replace the data directory, e.g. from a command line flag.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}
