//! Index document type.
//!
//! An `IndexDocument` is one unit written to the search engine. The
//! identifier doubles as the engine's `_id`, so writing the same identifier
//! twice overwrites rather than duplicates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the source field that mirrors the document identifier.
pub const ID_FIELD: &str = "id";

/// A single document destined for a search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Deterministic identifier of the source entity (and chunk, if any).
    pub id: String,
    /// Field name to value mapping sent as the document body.
    pub source: Map<String, Value>,
}

impl IndexDocument {
    /// Create a document whose body starts with the `id` field.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut source = Map::new();
        source.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        Self { id, source }
    }

    /// Set a field, consuming and returning the document.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field in place, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.source.insert(name.to_string(), value.into());
    }

    /// Look up a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.source.get(name)
    }
}
