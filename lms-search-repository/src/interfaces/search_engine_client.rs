//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, mocks, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::{BulkResponse, DeleteByQueryResponse, SearchRequest};
use lms_search_shared::BulkOperation;

/// Abstract interface for search engine operations.
///
/// This is a thin wrapper over the engine's HTTP protocol. It performs no
/// retries and defines no timeouts of its own; transport failures surface as
/// `SearchError` and are for the caller to handle.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Execute a search and return the raw response body.
    ///
    /// When `request.scroll` is set the response carries a `_scroll_id` that
    /// must eventually be released with [`clear_scroll`](Self::clear_scroll).
    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError>;

    /// Fetch the next page of an open scroll context.
    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError>;

    /// Release a scroll context.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError>;

    /// Write many documents in a single request.
    ///
    /// Each operation names its own target index. An empty slice must not
    /// contact the engine.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResponse)` - The request succeeded; `errors` reports item failures
    /// * `Err(SearchError::BulkIndexError)` - The request itself failed
    async fn bulk(&self, operations: &[BulkOperation]) -> Result<BulkResponse, SearchError>;

    /// Delete every document in `index` matching `body` (a `{"query": ..}` object).
    async fn delete_by_query(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<DeleteByQueryResponse, SearchError>;

    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Create an index with the given settings and mappings.
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError>;

    /// Drop an index. Dropping a missing index is not an error.
    async fn delete_index(&self, index: &str) -> Result<(), SearchError>;

    /// Register (or replace) an ingest pipeline.
    async fn put_pipeline(&self, id: &str, body: &Value) -> Result<(), SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the cluster status is green or yellow
    /// * `Ok(false)` - If the cluster status is red
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
