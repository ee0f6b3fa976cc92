//! # LMS Search Indexer
//!
//! Entry point library for the LMS search indexer: configuration, logging
//! setup, dependency wiring and the commands exposed by the binary.

pub mod commands;
pub mod config;
pub mod telemetry;

pub use config::{Dependencies, IndexerConfig};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] lms_search_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] lms_search_repository::SearchError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Some queued messages failed or were never handled.
    #[error("{failed} failed and {abandoned} abandoned of {total} messages")]
    IncompleteRun {
        failed: usize,
        abandoned: usize,
        total: usize,
    },

    /// Every message was handled, but the engine rejected some items.
    #[error("{degraded} of {total} messages had item failures")]
    DegradedRun { degraded: usize, total: usize },
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DegradedRun { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_run_has_distinct_exit_code() {
        let degraded = IndexingError::DegradedRun {
            degraded: 1,
            total: 3,
        };
        let incomplete = IndexingError::IncompleteRun {
            failed: 1,
            abandoned: 0,
            total: 3,
        };

        assert_eq!(degraded.exit_code(), 2);
        assert_eq!(incomplete.exit_code(), 1);
        assert_eq!(incomplete.to_string(), "1 failed and 0 abandoned of 3 messages");
    }
}
