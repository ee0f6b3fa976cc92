//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cluster::ClusterHealthParts,
    http::{
        headers::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE},
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        Method,
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
    ingest::IngestPutPipelineParts,
    ClearScrollParts, DeleteByQueryParts, OpenSearch, ScrollParts, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::SearchConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::bulk::{encode_bulk_body, BULK_CONTENT_ENCODING, BULK_CONTENT_TYPE};
use crate::types::{BulkResponse, DeleteByQueryResponse, SearchRequest};
use lms_search_shared::BulkOperation;

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let config = SearchConfig::with_url("http://localhost:9200");
/// let client = OpenSearchClient::new(&config)?;
///
/// let response = client
///     .search(&SearchRequest::new("lms-curriculum", json!({"query": {"match_all": {}}})))
///     .await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client from the connection settings.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError::Unavailable)` - If no URL is configured
    /// * `Err(SearchError::ConnectionError)` - If connection setup fails
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let url = match config.url.as_deref() {
            Some(url) if config.is_enabled() => url,
            _ => return Err(SearchError::Unavailable),
        };
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(user.clone(), pass.clone()));
        }
        let transport = builder
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        info!(url = %url, "Created OpenSearch client");

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Read a JSON body from a response, turning non-2xx statuses into errors.
    async fn read_json(
        response: Response,
        operation: &str,
        to_error: fn(String) -> SearchError,
    ) -> Result<Value, SearchError> {
        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, operation, "Request failed");
            return Err(to_error(format!(
                "{} failed with status {}: {}",
                operation, status, error_body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, request), fields(index = %request.index))]
    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let indices = [request.index.as_str()];
        let mut search = self
            .client
            .search(SearchParts::Index(&indices))
            .body(request.body.clone());
        if let Some(keep_alive) = request.scroll.as_deref() {
            search = search.scroll(keep_alive);
        }

        let response = search
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        Self::read_json(response, "Search", SearchError::QueryError).await
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": keep_alive,
                "scroll_id": scroll_id
            }))
            .send()
            .await
            .map_err(|e| SearchError::scroll(e.to_string()))?;

        Self::read_json(response, "Scroll", SearchError::ScrollError).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({
                "scroll_id": [scroll_id]
            }))
            .send()
            .await
            .map_err(|e| SearchError::scroll(e.to_string()))?;

        let status = response.status_code();
        // 404 means the context already expired
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::scroll(format!(
                "Clear scroll failed with status {}: {}",
                status, error_body
            )));
        }

        debug!("Scroll context released");
        Ok(())
    }

    #[instrument(skip(self, operations), fields(operation_count = operations.len()))]
    async fn bulk(&self, operations: &[BulkOperation]) -> Result<BulkResponse, SearchError> {
        if operations.is_empty() {
            return Ok(BulkResponse::default());
        }

        let body = encode_bulk_body(operations)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(BULK_CONTENT_TYPE));
        headers.insert(
            CONTENT_ENCODING,
            HeaderValue::from_static(BULK_CONTENT_ENCODING),
        );

        let response = self
            .client
            .send(
                Method::Post,
                "/_bulk",
                headers,
                Option::<&()>::None,
                Some(body),
                None,
            )
            .await
            .map_err(|e| SearchError::bulk_index(e.to_string()))?;

        let value = Self::read_json(response, "Bulk", SearchError::BulkIndexError).await?;
        let parsed: BulkResponse =
            serde_json::from_value(value).map_err(|e| SearchError::parse(e.to_string()))?;

        if parsed.errors {
            warn!(
                failed = parsed.failed_items(),
                total = operations.len(),
                "Bulk request reported item errors"
            );
        } else {
            debug!(count = operations.len(), took = parsed.took, "Bulk request succeeded");
        }

        Ok(parsed)
    }

    async fn delete_by_query(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<DeleteByQueryResponse, SearchError> {
        let indices = [index];
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&indices))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| SearchError::delete(e.to_string()))?;

        let value = Self::read_json(response, "Delete by query", SearchError::DeleteError).await?;
        let parsed: DeleteByQueryResponse =
            serde_json::from_value(value).map_err(|e| SearchError::parse(e.to_string()))?;

        debug!(index = %index, deleted = parsed.deleted, "Delete by query completed");
        Ok(parsed)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let indices = [index];
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&indices))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| SearchError::index_creation(e.to_string()))?;

        Self::read_json(response, "Create index", SearchError::IndexCreationError).await?;
        info!(index = %index, "Created index");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        let indices = [index];
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&indices))
            .send()
            .await
            .map_err(|e| SearchError::index_creation(e.to_string()))?;

        let status = response.status_code();
        // 404 is acceptable - index may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::index_creation(format!(
                "Delete index failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, "Dropped index");
        Ok(())
    }

    async fn put_pipeline(&self, id: &str, body: &Value) -> Result<(), SearchError> {
        let response = self
            .client
            .ingest()
            .put_pipeline(IngestPutPipelineParts::Id(id))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| SearchError::pipeline(e.to_string()))?;

        Self::read_json(response, "Put pipeline", SearchError::PipelineError).await?;
        info!(pipeline = %id, "Registered ingest pipeline");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let value = Self::read_json(response, "Health check", SearchError::ConnectionError).await?;
        let status = value.get("status").and_then(Value::as_str).unwrap_or("red");
        Ok(status != "red")
    }
}
