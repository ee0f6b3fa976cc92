//! Static index schema descriptors.
//!
//! Every index carries a `_meta.version` string so that a changed mapping can
//! be detected and migrated later.

use serde_json::{json, Map, Value};

/// Languages that get a dedicated analyzer sub-field on text fields.
pub const TEXT_LANGUAGES: [&str; 3] = ["english", "french", "spanish"];

/// Settings and mappings for one search index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMapping {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub version: String,
    pub extra_settings: Map<String, Value>,
    pub properties: Map<String, Value>,
}

impl IndexMapping {
    /// One shard, one replica, no fields.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
            version: version.into(),
            extra_settings: Map::new(),
            properties: Map::new(),
        }
    }

    pub fn with_setting(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.extra_settings.insert(name.to_string(), value.into());
        self
    }

    pub fn with_property(mut self, name: &str, definition: Value) -> Self {
        self.properties.insert(name.to_string(), definition);
        self
    }

    /// Render the body accepted by the create-index endpoint.
    pub fn to_body(&self) -> Value {
        let mut settings = Map::new();
        settings.insert("number_of_shards".to_string(), json!(self.number_of_shards));
        settings.insert(
            "number_of_replicas".to_string(),
            json!(self.number_of_replicas),
        );
        for (name, value) in &self.extra_settings {
            settings.insert(name.clone(), value.clone());
        }

        json!({
            "settings": settings,
            "mappings": {
                "_meta": {
                    "version": self.version,
                },
                "properties": self.properties,
            }
        })
    }

    /// Standard-analyzed text with one sub-field per supported language.
    pub fn multilingual_text() -> Value {
        let fields: Map<String, Value> = TEXT_LANGUAGES
            .iter()
            .map(|lang| {
                (
                    lang.to_string(),
                    json!({ "type": "text", "analyzer": lang }),
                )
            })
            .collect();

        json!({
            "type": "text",
            "analyzer": "standard",
            "fields": fields,
        })
    }

    pub fn keyword() -> Value {
        json!({ "type": "keyword" })
    }

    pub fn integer() -> Value {
        json!({ "type": "integer" })
    }

    pub fn date() -> Value {
        json!({ "type": "date" })
    }

    /// Text analyzed as a single token.
    pub fn keyword_text() -> Value {
        json!({ "type": "text", "analyzer": "keyword" })
    }
}

/// A server-side ingest pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDefinition {
    pub id: String,
    pub body: Value,
}
