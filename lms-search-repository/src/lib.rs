//! # LMS Search Repository
//!
//! This crate provides the interface for talking to the search engine and a
//! concrete implementation for OpenSearch. It covers the search, scroll,
//! bulk-write, delete-by-query and index-management calls used by the
//! indexing pipeline.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::SearchConfig;
pub use errors::SearchError;
pub use interfaces::SearchEngineClient;
pub use opensearch::OpenSearchClient;
pub use types::{BulkResponse, DeleteByQueryResponse, ScrollPage, SearchRequest};
