//! Bulk operation types.
//!
//! The bulk wire protocol pairs an action line with a document line. The
//! pair is kept together here so that the ordering can't drift apart during
//! serialization.

use serde_json::{json, Map, Value};

use crate::document::IndexDocument;

/// Action descriptor preceding a document in a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAction {
    /// Target index name.
    pub index: String,
    /// Document identifier (`_id`).
    pub id: String,
}

impl BulkAction {
    /// Create an index action for the given index and document id.
    pub fn index(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
        }
    }

    /// Render the action line, e.g. `{"index":{"_index":"x","_id":"1"}}`.
    pub fn to_json(&self) -> Value {
        json!({
            "index": {
                "_index": self.index,
                "_id": self.id,
            }
        })
    }
}

/// An ordered (action, document) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub action: BulkAction,
    pub document: Map<String, Value>,
}

impl BulkOperation {
    /// Build an index operation targeting `index` from a document.
    pub fn index(index: &str, document: IndexDocument) -> Self {
        Self {
            action: BulkAction::index(index, document.id),
            document: document.source,
        }
    }

    /// The two JSON values of this operation, action first.
    pub fn lines(&self) -> [Value; 2] {
        [self.action.to_json(), Value::Object(self.document.clone())]
    }
}
