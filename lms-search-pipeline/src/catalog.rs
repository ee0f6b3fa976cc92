//! Shared plumbing for every search index the pipeline writes to.
//!
//! A catalog is bound to one index and knows how to ask which entities are
//! already indexed, enumerate every indexed id, write documents in bulk and
//! delete by a single field value. The concrete indexers build on it.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use lms_search_repository::opensearch::queries::{
    build_id_projection_query, build_skip_set_query, build_term_query, parse_aggregation_keys,
    parse_source_field, SIZE_LIMIT,
};
use lms_search_repository::{ScrollPage, SearchEngineClient, SearchRequest};
use lms_search_shared::{BulkOperation, CatalogKey, IndexDocument, IngestStamp, SkipSet};

use crate::errors::PipelineError;

/// Access to one search index.
///
/// A catalog without a client is disabled: every engine call fails with
/// [`PipelineError::SearchUnavailable`].
#[derive(Clone)]
pub struct IndexedEntityCatalog {
    client: Option<Arc<dyn SearchEngineClient>>,
    index: String,
    scroll_keep_alive: String,
}

impl IndexedEntityCatalog {
    pub fn new(
        client: Option<Arc<dyn SearchEngineClient>>,
        index: impl Into<String>,
        scroll_keep_alive: impl Into<String>,
    ) -> Self {
        Self {
            client,
            index: index.into(),
            scroll_keep_alive: scroll_keep_alive.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&dyn SearchEngineClient, PipelineError> {
        self.client
            .as_deref()
            .ok_or(PipelineError::SearchUnavailable)
    }

    /// Find which `candidates` are already present in the index.
    ///
    /// With `ingested_since`, only documents whose ingest field is at or after
    /// the stamp count. Candidates are queried in batches below the
    /// aggregation bucket limit. The result never holds a non-candidate.
    #[instrument(skip(self, candidates, ingested_since), fields(index = %self.index, candidates = candidates.len()))]
    pub async fn compute_skip_set<K: CatalogKey>(
        &self,
        field: &str,
        candidates: &[K],
        ingested_since: Option<(&str, &IngestStamp)>,
    ) -> Result<SkipSet<K>, PipelineError> {
        let client = self.client()?;
        if candidates.is_empty() {
            return Ok(SkipSet::empty());
        }

        let mut found: Vec<K> = Vec::new();
        for batch in candidates.chunks(SIZE_LIMIT) {
            let query = build_skip_set_query(field, batch, ingested_since);
            let response = client
                .search(&SearchRequest::new(&self.index, query))
                .await?;
            found.extend(parse_aggregation_keys::<K>(&response, field)?);
        }

        let skip = SkipSet::from_candidates(candidates, found);
        debug!(skipped = skip.len(), "Computed skip set");
        Ok(skip)
    }

    /// Pair each document with a bulk action targeting this index.
    pub fn build_bulk_payload(&self, documents: Vec<IndexDocument>) -> Vec<BulkOperation> {
        documents
            .into_iter()
            .map(|doc| BulkOperation::index(&self.index, doc))
            .collect()
    }

    /// Write documents in one bulk request.
    ///
    /// Returns `Ok(false)` when the engine reports item failures. Nothing is
    /// sent for an empty list.
    #[instrument(skip(self, documents), fields(index = %self.index, count = documents.len()))]
    pub async fn bulk_index(&self, documents: Vec<IndexDocument>) -> Result<bool, PipelineError> {
        let client = self.client()?;
        if documents.is_empty() {
            return Ok(true);
        }

        let operations = self.build_bulk_payload(documents);
        let response = client.bulk(&operations).await?;
        if response.errors {
            warn!(
                failed = response.failed_items(),
                total = operations.len(),
                "Bulk request reported item failures"
            );
            return Ok(false);
        }

        info!(count = operations.len(), "Indexed documents");
        Ok(true)
    }

    /// Visit the `field` value of every document in the index.
    ///
    /// Pages are fetched through a scroll context until an empty page comes
    /// back or `visit` breaks. The context is released on every exit path,
    /// including errors.
    #[instrument(skip(self, visit), fields(index = %self.index))]
    pub async fn for_each_id<K, F>(&self, field: &str, mut visit: F) -> Result<(), PipelineError>
    where
        K: CatalogKey,
        F: FnMut(K) -> ControlFlow<()>,
    {
        let client = self.client()?;
        let request = SearchRequest::new(&self.index, build_id_projection_query(field))
            .with_scroll(&self.scroll_keep_alive);
        let first = client.search(&request).await?;

        let mut page = ScrollPage::from_response(&first);
        let mut scroll_id = page.scroll_id.clone();
        let outcome = self
            .drain(client, field, &mut page, &mut scroll_id, &mut visit)
            .await;

        if let Some(id) = scroll_id {
            if let Err(e) = client.clear_scroll(&id).await {
                warn!(error = %e, "Failed to release scroll context");
            }
        }

        outcome
    }

    async fn drain<K, F>(
        &self,
        client: &dyn SearchEngineClient,
        field: &str,
        page: &mut ScrollPage,
        scroll_id: &mut Option<String>,
        visit: &mut F,
    ) -> Result<(), PipelineError>
    where
        K: CatalogKey,
        F: FnMut(K) -> ControlFlow<()>,
    {
        while !page.is_empty() {
            for source in page.sources() {
                match parse_source_field::<K>(source, field) {
                    Some(id) => {
                        if visit(id).is_break() {
                            return Ok(());
                        }
                    }
                    None => debug!(field, "Hit without a readable id"),
                }
            }

            let Some(current) = scroll_id.clone() else {
                break;
            };
            let next = client.scroll(&current, &self.scroll_keep_alive).await?;
            *page = ScrollPage::from_response(&next);
            if page.scroll_id.is_some() {
                *scroll_id = page.scroll_id.clone();
            }
        }
        Ok(())
    }

    /// Collect the `field` value of every document in the index.
    pub async fn enumerate_all_ids<K: CatalogKey>(
        &self,
        field: &str,
    ) -> Result<Vec<K>, PipelineError> {
        let mut ids = Vec::new();
        self.for_each_id(field, |id: K| {
            ids.push(id);
            ControlFlow::Continue(())
        })
        .await?;
        debug!(index = %self.index, count = ids.len(), "Enumerated indexed ids");
        Ok(ids)
    }

    /// Run a query against the index and return the raw response.
    pub async fn search(&self, body: Value) -> Result<Value, PipelineError> {
        let client = self.client()?;
        Ok(client.search(&SearchRequest::new(&self.index, body)).await?)
    }

    /// Delete every document whose `field` equals `value`.
    ///
    /// Returns `Ok(false)` when the engine reports failures.
    #[instrument(skip(self, value), fields(index = %self.index))]
    pub async fn delete_by_field<V: Serialize>(
        &self,
        field: &str,
        value: V,
    ) -> Result<bool, PipelineError> {
        let client = self.client()?;
        let response = client
            .delete_by_query(&self.index, &build_term_query(field, value))
            .await?;
        if !response.is_clean() {
            warn!(failures = response.failures.len(), "Delete by query reported failures");
        }
        Ok(response.is_clean())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearchEngine;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    const INDEX: &str = "test-index";

    fn catalog(engine: &Arc<MockSearchEngine>) -> IndexedEntityCatalog {
        IndexedEntityCatalog::new(Some(engine.clone() as Arc<dyn SearchEngineClient>), INDEX, "5m")
    }

    #[tokio::test]
    async fn test_disabled_catalog_is_unavailable() {
        let catalog = IndexedEntityCatalog::new(None, INDEX, "5m");

        assert!(!catalog.is_enabled());
        let err = catalog.bulk_index(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::SearchUnavailable));
        let err = catalog.enumerate_all_ids::<i64>("id").await.unwrap_err();
        assert!(matches!(err, PipelineError::SearchUnavailable));
    }

    #[tokio::test]
    async fn test_skip_set_is_limited_to_candidates() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_skip(INDEX, "courseId", vec![json!(2), json!(42)]);

        let skip = catalog(&engine)
            .compute_skip_set("courseId", &[1_i64, 2, 3], None)
            .await
            .unwrap();

        assert_eq!(skip.len(), 1);
        assert!(skip.contains(&2));
        let searches = engine.searches.lock().unwrap();
        assert_eq!(searches[0].body["size"], 0);
        assert_eq!(searches[0].body["query"]["bool"]["filter"][0]["terms"]["courseId"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_skip_set_empty_candidates_makes_no_call() {
        let engine = Arc::new(MockSearchEngine::new());

        let skip = catalog(&engine)
            .compute_skip_set::<i64>("courseId", &[], None)
            .await
            .unwrap();

        assert!(skip.is_empty());
        assert!(engine.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_index_empty_sends_nothing() {
        let engine = Arc::new(MockSearchEngine::new());

        assert!(catalog(&engine).bulk_index(Vec::new()).await.unwrap());
        assert_eq!(engine.bulk_count(), 0);
    }

    #[tokio::test]
    async fn test_bulk_index_reports_item_failures() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.bulk_errors.store(true, Ordering::SeqCst);

        let ok = catalog(&engine)
            .bulk_index(vec![IndexDocument::new("a"), IndexDocument::new("b")])
            .await
            .unwrap();

        assert!(!ok);
        assert_eq!(engine.bulk_ids(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_build_bulk_payload_targets_index() {
        let engine = Arc::new(MockSearchEngine::new());

        let ops = catalog(&engine).build_bulk_payload(vec![IndexDocument::new("doc-1")]);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].lines()[0], json!({"index": {"_index": INDEX, "_id": "doc-1"}}));
    }

    #[tokio::test]
    async fn test_enumerate_all_ids_across_pages() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_id_pages(
            INDEX,
            "courseId",
            vec![vec![json!(1), json!(2)], vec![json!(3), json!(4)]],
        );

        let ids: Vec<i64> = catalog(&engine).enumerate_all_ids("courseId").await.unwrap();

        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(engine.scroll_calls.load(Ordering::SeqCst), 2);
        assert_eq!(*engine.cleared.lock().unwrap(), vec![format!("scroll-{}", INDEX)]);
        let searches = engine.searches.lock().unwrap();
        assert_eq!(searches[0].scroll.as_deref(), Some("5m"));
        assert_eq!(searches[0].body["_source"], json!(["courseId"]));
    }

    #[tokio::test]
    async fn test_enumerate_empty_index_still_clears_scroll() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_id_pages(INDEX, "id", Vec::new());

        let ids: Vec<String> = catalog(&engine).enumerate_all_ids("id").await.unwrap();

        assert!(ids.is_empty());
        assert_eq!(engine.scroll_calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.cleared.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scroll_failure_still_clears_scroll() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_id_pages(INDEX, "id", vec![vec![json!("D1")], vec![json!("D2")]]);
        engine.fail_scroll.store(true, Ordering::SeqCst);

        let err = catalog(&engine)
            .enumerate_all_ids::<String>("id")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EngineRequest(_)));
        assert_eq!(engine.cleared.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_for_each_id_stops_early_and_clears() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_id_pages(INDEX, "id", vec![vec![json!(1), json!(2)], vec![json!(3)]]);

        let mut seen = Vec::new();
        catalog(&engine)
            .for_each_id("id", |id: i64| {
                seen.push(id);
                if id == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(engine.scroll_calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.cleared.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_field() {
        let engine = Arc::new(MockSearchEngine::new());

        assert!(catalog(&engine).delete_by_field("sessionId", 9).await.unwrap());
        engine.delete_failures.store(true, Ordering::SeqCst);
        assert!(!catalog(&engine).delete_by_field("sessionId", 9).await.unwrap());

        let deletes = engine.deletes.lock().unwrap();
        assert_eq!(deletes[0], (INDEX.to_string(), json!({"query": {"term": {"sessionId": 9}}})));
    }
}
