//! MeSH descriptor index.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{info, instrument};

use lms_search_repository::{SearchConfig, SearchEngineClient};
use lms_search_shared::{
    EntityKind, IndexDocument, IndexMapping, IndexableEntity, IngestStamp, MeshDescriptorDto,
};

use super::{expect_all, SearchIndex};
use crate::catalog::IndexedEntityCatalog;
use crate::errors::PipelineError;

pub const MESH_INDEX: &str = "lms-mesh";

const ID_FIELD: &str = "id";
const INGEST_TIME_FIELD: &str = "ingestTime";

pub struct MeshIndexer {
    catalog: IndexedEntityCatalog,
}

impl MeshIndexer {
    pub fn new(client: Option<Arc<dyn SearchEngineClient>>, config: &SearchConfig) -> Self {
        Self {
            catalog: IndexedEntityCatalog::new(client, MESH_INDEX, config.scroll_keep_alive.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.catalog.is_enabled()
    }

    /// Index descriptors not ingested since `stamp`.
    #[instrument(skip(self, descriptors, stamp), fields(count = descriptors.len()))]
    pub async fn index(
        &self,
        descriptors: &[IndexableEntity],
        stamp: &IngestStamp,
    ) -> Result<bool, PipelineError> {
        if !self.is_enabled() {
            return Err(PipelineError::SearchUnavailable);
        }
        let descriptors = expect_all(descriptors, EntityKind::MeshDescriptor, |e| match e {
            IndexableEntity::MeshDescriptor(dto) => Some(dto),
            _ => None,
        })?;

        let ids: Vec<String> = descriptors.iter().map(|d| d.id.clone()).collect();
        let skip = self
            .catalog
            .compute_skip_set(ID_FIELD, &ids, Some((INGEST_TIME_FIELD, stamp)))
            .await?;

        let ingest_time = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        let documents: Vec<IndexDocument> = descriptors
            .into_iter()
            .filter(|d| !skip.contains(&d.id))
            .map(|d| build_document(d, &ingest_time))
            .collect();

        info!(
            skipped = skip.len(),
            documents = documents.len(),
            "Indexing mesh descriptors"
        );
        self.catalog.bulk_index(documents).await
    }

    /// Ids of descriptors matching `text`, best match first.
    pub async fn id_search(&self, text: &str, size: usize) -> Result<Vec<String>, PipelineError> {
        let response = self
            .catalog
            .search(json!({
                "query": {
                    "multi_match": {
                        "query": text,
                        "type": "most_fields",
                        "fields": ["id^5", "name^3", "termNames^2", "conceptNames", "scopeNotes", "annotation"]
                    }
                },
                "_source": [ID_FIELD],
                "size": size
            }))
            .await?;

        Ok(response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit.pointer("/_source/id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn get_all_ids(&self) -> Result<Vec<String>, PipelineError> {
        self.catalog.enumerate_all_ids(ID_FIELD).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, PipelineError> {
        self.catalog.delete_by_field(ID_FIELD, id).await
    }

    pub fn get_mapping() -> IndexMapping {
        let text = IndexMapping::multilingual_text;
        IndexMapping::new("1")
            .with_property(ID_FIELD, IndexMapping::keyword())
            .with_property("name", text())
            .with_property("annotation", text())
            .with_property("previousIndexing", text())
            .with_property("conceptNames", text())
            .with_property("scopeNotes", text())
            .with_property("casn1Names", text())
            .with_property("termNames", text())
            .with_property(INGEST_TIME_FIELD, IndexMapping::date())
    }
}

impl SearchIndex for MeshIndexer {
    fn index_name(&self) -> &str {
        self.catalog.index_name()
    }

    fn mapping(&self) -> IndexMapping {
        Self::get_mapping()
    }
}

fn build_document(descriptor: &MeshDescriptorDto, ingest_time: &str) -> IndexDocument {
    let concepts = &descriptor.concepts;
    IndexDocument::new(descriptor.id.clone())
        .with_field("name", descriptor.name.clone())
        .with_field("annotation", descriptor.annotation.clone())
        .with_field("previousIndexing", descriptor.previous_indexing.clone())
        .with_field(
            "conceptNames",
            concepts.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
        )
        .with_field(
            "scopeNotes",
            concepts
                .iter()
                .filter_map(|c| c.scope_note.clone())
                .collect::<Vec<_>>(),
        )
        .with_field(
            "casn1Names",
            concepts
                .iter()
                .filter_map(|c| c.casn1_name.clone())
                .collect::<Vec<_>>(),
        )
        .with_field(
            "termNames",
            concepts
                .iter()
                .flat_map(|c| c.terms.iter().map(|t| t.name.clone()))
                .collect::<Vec<_>>(),
        )
        .with_field(INGEST_TIME_FIELD, ingest_time)
}
