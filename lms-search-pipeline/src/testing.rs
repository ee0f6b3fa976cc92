//! In-memory search engine used by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use lms_search_repository::{
    BulkResponse, DeleteByQueryResponse, SearchEngineClient, SearchError, SearchRequest,
};
use lms_search_shared::BulkOperation;

/// Scripted search engine.
///
/// Searches pop the next queued response for their index. A skip-set query
/// with nothing queued gets empty buckets; any other search gets no hits.
/// Scrolls pop from the queue of their scroll id.
#[derive(Default)]
pub(crate) struct MockSearchEngine {
    search_responses: Mutex<HashMap<String, VecDeque<Value>>>,
    scroll_responses: Mutex<HashMap<String, VecDeque<Value>>>,
    pub searches: Mutex<Vec<SearchRequest>>,
    pub scroll_calls: AtomicUsize,
    pub cleared: Mutex<Vec<String>>,
    pub bulks: Mutex<Vec<Vec<BulkOperation>>>,
    pub bulk_errors: AtomicBool,
    pub deletes: Mutex<Vec<(String, Value)>>,
    pub delete_failures: AtomicBool,
    pub existing: Mutex<HashSet<String>>,
    pub created: Mutex<Vec<(String, Value)>>,
    pub dropped: Mutex<Vec<String>>,
    pub pipelines: Mutex<Vec<(String, Value)>>,
    pub fail_scroll: AtomicBool,
}

impl MockSearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_search(&self, index: &str, response: Value) {
        self.search_responses
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn queue_scroll(&self, scroll_id: &str, response: Value) {
        self.scroll_responses
            .lock()
            .unwrap()
            .entry(scroll_id.to_string())
            .or_default()
            .push_back(response);
    }

    /// Queue an aggregation answer listing `keys` as already indexed.
    pub fn queue_skip(&self, index: &str, field: &str, keys: Vec<Value>) {
        let buckets: Vec<Value> = keys
            .into_iter()
            .map(|key| json!({"key": key, "doc_count": 1}))
            .collect();
        self.queue_search(
            index,
            json!({"hits": {"hits": []}, "aggregations": {field: {"buckets": buckets}}}),
        );
    }

    /// Queue a full scroll: a first page from the search, then one scroll
    /// call per remaining page, then an empty page.
    pub fn queue_id_pages(&self, index: &str, field: &str, pages: Vec<Vec<Value>>) {
        let scroll_id = format!("scroll-{}", index);
        let mut pages = pages.into_iter().map(|ids| page(&scroll_id, field, ids));
        let first = pages
            .next()
            .unwrap_or_else(|| page(&scroll_id, field, Vec::new()));
        self.queue_search(index, first);
        for next in pages {
            self.queue_scroll(&scroll_id, next);
        }
        self.queue_scroll(&scroll_id, page(&scroll_id, field, Vec::new()));
    }

    pub fn bulk_count(&self) -> usize {
        self.bulks.lock().unwrap().len()
    }

    /// `_id`s of every bulk operation sent so far, in order.
    pub fn bulk_ids(&self) -> Vec<String> {
        self.bulks
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|op| op.action.id.clone())
            .collect()
    }

    /// Document sources of every bulk operation sent so far, in order.
    pub fn bulk_documents(&self) -> Vec<Map<String, Value>> {
        self.bulks
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|op| op.document.clone())
            .collect()
    }
}

fn page(scroll_id: &str, field: &str, ids: Vec<Value>) -> Value {
    let hits: Vec<Value> = ids
        .into_iter()
        .map(|id| json!({"_source": {field: id}}))
        .collect();
    json!({"_scroll_id": scroll_id, "hits": {"hits": hits}})
}

fn empty_aggregations(body: &Value) -> Value {
    let mut aggregations = Map::new();
    if let Some(aggs) = body.get("aggs").and_then(Value::as_object) {
        for name in aggs.keys() {
            aggregations.insert(name.clone(), json!({"buckets": []}));
        }
    }
    json!({"hits": {"hits": []}, "aggregations": aggregations})
}

#[async_trait]
impl SearchEngineClient for MockSearchEngine {
    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        self.searches.lock().unwrap().push(request.clone());
        let queued = self
            .search_responses
            .lock()
            .unwrap()
            .get_mut(&request.index)
            .and_then(VecDeque::pop_front);
        Ok(queued.unwrap_or_else(|| empty_aggregations(&request.body)))
    }

    async fn scroll(&self, scroll_id: &str, _keep_alive: &str) -> Result<Value, SearchError> {
        self.scroll_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_scroll.load(Ordering::SeqCst) {
            return Err(SearchError::scroll("scroll context lost"));
        }
        let queued = self
            .scroll_responses
            .lock()
            .unwrap()
            .get_mut(scroll_id)
            .and_then(VecDeque::pop_front);
        Ok(queued.unwrap_or_else(|| json!({"_scroll_id": scroll_id, "hits": {"hits": []}})))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        self.cleared.lock().unwrap().push(scroll_id.to_string());
        Ok(())
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> Result<BulkResponse, SearchError> {
        self.bulks.lock().unwrap().push(operations.to_vec());
        Ok(BulkResponse {
            took: 1,
            errors: self.bulk_errors.load(Ordering::SeqCst),
            items: Vec::new(),
        })
    }

    async fn delete_by_query(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<DeleteByQueryResponse, SearchError> {
        self.deletes
            .lock()
            .unwrap()
            .push((index.to_string(), body.clone()));
        let failures = if self.delete_failures.load(Ordering::SeqCst) {
            vec![json!({"cause": {"type": "version_conflict_engine_exception"}})]
        } else {
            Vec::new()
        };
        Ok(DeleteByQueryResponse {
            deleted: 1,
            failures,
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        Ok(self.existing.lock().unwrap().contains(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        self.existing.lock().unwrap().insert(index.to_string());
        self.created
            .lock()
            .unwrap()
            .push((index.to_string(), body.clone()));
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        self.existing.lock().unwrap().remove(index);
        self.dropped.lock().unwrap().push(index.to_string());
        Ok(())
    }

    async fn put_pipeline(&self, id: &str, body: &Value) -> Result<(), SearchError> {
        self.pipelines
            .lock()
            .unwrap()
            .push((id.to_string(), body.clone()));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}
