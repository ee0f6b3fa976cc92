//! Search error types.
//!
//! This module defines the error types that can occur while talking to the
//! search engine. None of them are retried internally; callers decide.

use thiserror::Error;

/// Errors that can occur during search engine operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// No search engine connection is configured.
    #[error("Search is not configured")]
    Unavailable,

    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Search query execution failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Fetching or releasing a scroll context failed.
    #[error("Scroll error: {0}")]
    ScrollError(String),

    /// The bulk request itself failed (not per-item errors).
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Delete-by-query failed.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to create or drop an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to register an ingest pipeline.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Failed to parse response from search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a scroll error.
    pub fn scroll(msg: impl Into<String>) -> Self {
        Self::ScrollError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a pipeline error.
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::PipelineError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
