//! Creating and dropping the search indexes.

use std::sync::Arc;

use tracing::{info, instrument};

use lms_search_repository::SearchEngineClient;
use lms_search_shared::{IndexMapping, PipelineDefinition};

use crate::errors::PipelineError;
use crate::indexers::SearchIndex;

/// Everything needed to create one index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub mapping: IndexMapping,
    pub pipeline: Option<PipelineDefinition>,
}

impl IndexDefinition {
    pub fn of(index: &dyn SearchIndex) -> Self {
        Self {
            name: index.index_name().to_string(),
            mapping: index.mapping(),
            pipeline: index.pipeline(),
        }
    }
}

pub struct IndexManager {
    client: Option<Arc<dyn SearchEngineClient>>,
    definitions: Vec<IndexDefinition>,
}

impl IndexManager {
    pub fn new(
        client: Option<Arc<dyn SearchEngineClient>>,
        definitions: Vec<IndexDefinition>,
    ) -> Self {
        Self {
            client,
            definitions,
        }
    }

    /// Manager for the indexes behind the given indexers, in order.
    pub fn for_indexes(
        client: Option<Arc<dyn SearchEngineClient>>,
        indexes: &[&dyn SearchIndex],
    ) -> Self {
        let definitions = indexes
            .iter()
            .map(|index| IndexDefinition::of(*index))
            .collect();
        Self::new(client, definitions)
    }

    /// Create every index that does not exist yet, registering its ingest
    /// pipeline first. Returns the names of the indexes created.
    #[instrument(skip(self))]
    pub async fn create_indexes(&self) -> Result<Vec<String>, PipelineError> {
        let Some(client) = self.client.as_deref() else {
            info!("Search is disabled, not creating indexes");
            return Ok(Vec::new());
        };

        let mut created = Vec::new();
        for definition in &self.definitions {
            if let Some(pipeline) = &definition.pipeline {
                client.put_pipeline(&pipeline.id, &pipeline.body).await?;
            }
            if client.index_exists(&definition.name).await? {
                info!(index = %definition.name, "Index already exists");
                continue;
            }
            client
                .create_index(&definition.name, &definition.mapping.to_body())
                .await?;
            info!(index = %definition.name, version = %definition.mapping.version, "Created index");
            created.push(definition.name.clone());
        }
        Ok(created)
    }

    /// Drop every managed index. Returns the names dropped.
    #[instrument(skip(self))]
    pub async fn drop_indexes(&self) -> Result<Vec<String>, PipelineError> {
        let Some(client) = self.client.as_deref() else {
            info!("Search is disabled, not dropping indexes");
            return Ok(Vec::new());
        };

        let mut dropped = Vec::new();
        for definition in &self.definitions {
            client.delete_index(&definition.name).await?;
            info!(index = %definition.name, "Dropped index");
            dropped.push(definition.name.clone());
        }
        Ok(dropped)
    }

    /// Whether the engine is configured and reports a usable cluster.
    pub async fn is_healthy(&self) -> Result<bool, PipelineError> {
        match self.client.as_deref() {
            Some(client) => Ok(client.health_check().await?),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FileContentProvider;
    use crate::errors::PipelineError;
    use crate::indexers::{
        CurriculumIndexer, LearningMaterialIndexer, MeshIndexer, CURRICULUM_INDEX,
        LEARNING_MATERIALS_INDEX, MESH_INDEX,
    };
    use crate::testing::MockSearchEngine;
    use async_trait::async_trait;
    use lms_search_repository::SearchConfig;

    struct NoFiles;

    #[async_trait]
    impl FileContentProvider for NoFiles {
        async fn get_file_contents(&self, _path: &str) -> Result<Option<Vec<u8>>, PipelineError> {
            Ok(None)
        }
    }

    fn manager(client: Option<Arc<dyn SearchEngineClient>>) -> IndexManager {
        let config = SearchConfig::default();
        let learning_materials = LearningMaterialIndexer::new(None, Arc::new(NoFiles), &config);
        let curriculum = CurriculumIndexer::new(None, &config);
        let mesh = MeshIndexer::new(None, &config);
        let indexes: [&dyn SearchIndex; 3] = [&learning_materials, &curriculum, &mesh];
        IndexManager::for_indexes(client, &indexes)
    }

    #[tokio::test]
    async fn test_create_indexes_skips_existing() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.existing.lock().unwrap().insert(MESH_INDEX.to_string());
        let manager = manager(Some(engine.clone() as Arc<dyn SearchEngineClient>));

        let created = manager.create_indexes().await.unwrap();

        assert_eq!(created, vec![LEARNING_MATERIALS_INDEX, CURRICULUM_INDEX]);
        let pipelines = engine.pipelines.lock().unwrap();
        assert_eq!(pipelines.len(), 1);
        assert_eq!(pipelines[0].0, "curriculum");
        let bodies = engine.created.lock().unwrap();
        assert_eq!(bodies[1].1["settings"]["default_pipeline"], "curriculum");
    }

    #[tokio::test]
    async fn test_drop_indexes() {
        let engine = Arc::new(MockSearchEngine::new());
        let manager = manager(Some(engine.clone() as Arc<dyn SearchEngineClient>));

        manager.create_indexes().await.unwrap();
        let dropped = manager.drop_indexes().await.unwrap();

        assert_eq!(dropped.len(), 3);
        assert!(engine.existing.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_manager_does_nothing() {
        let manager = manager(None);

        assert!(manager.create_indexes().await.unwrap().is_empty());
        assert!(manager.drop_indexes().await.unwrap().is_empty());
        assert!(!manager.is_healthy().await.unwrap());
    }

    #[test]
    fn test_definition_of_indexer() {
        let indexer = CurriculumIndexer::new(None, &SearchConfig::default());

        let definition = IndexDefinition::of(&indexer);

        assert_eq!(definition.name, CURRICULUM_INDEX);
        assert!(definition.pipeline.is_some());
    }
}
