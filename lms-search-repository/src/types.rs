//! Request and response types for the search engine client.

use serde::Deserialize;
use serde_json::Value;

/// A search against one index, optionally opening a scroll context.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    pub body: Value,
    /// Scroll keep-alive (e.g. "5m"). `Some` opens a scroll context.
    pub scroll: Option<String>,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            body,
            scroll: None,
        }
    }

    /// Open a scroll context kept alive for `keep_alive`.
    pub fn with_scroll(mut self, keep_alive: impl Into<String>) -> Self {
        self.scroll = Some(keep_alive.into());
        self
    }
}

/// Response of the bulk endpoint.
///
/// `errors` is true when at least one item failed even though the HTTP
/// request itself succeeded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl BulkResponse {
    /// Number of items whose action result carries an `error` object.
    pub fn failed_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                item.as_object()
                    .map(|actions| actions.values().any(|r| r.get("error").is_some()))
                    .unwrap_or(false)
            })
            .count()
    }
}

/// Response of the delete-by-query endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteByQueryResponse {
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub failures: Vec<Value>,
}

impl DeleteByQueryResponse {
    /// True when the engine reported no failures.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One page of hits from a search or scroll call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    pub scroll_id: Option<String>,
    pub hits: Vec<Value>,
}

impl ScrollPage {
    /// Extract `_scroll_id` and `hits.hits` from a raw response.
    pub fn from_response(response: &Value) -> Self {
        let scroll_id = response
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let hits = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self { scroll_id, hits }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The `_source` of every hit that has one.
    pub fn sources(&self) -> impl Iterator<Item = &Value> {
        self.hits.iter().filter_map(|hit| hit.get("_source"))
    }
}
