//! Dependency initialization and wiring for the search indexer.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::IndexerConfig;
use crate::IndexingError;
use lms_search_pipeline::{
    CurriculumIndexer, EntityRepository, FileContentProvider, IndexManager, IndexMessageHandler,
    JsonSnapshotRepository, LearningMaterialIndexer, LocalFileContentProvider, MeshIndexer,
    MessageDispatcher, ReconciliationDriver, SearchIndex,
};
use lms_search_repository::{OpenSearchClient, SearchEngineClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// `None` when search is disabled.
    pub client: Option<Arc<dyn SearchEngineClient>>,
    pub repository: Arc<dyn EntityRepository>,
    pub learning_materials: Arc<LearningMaterialIndexer>,
    pub curriculum: Arc<CurriculumIndexer>,
    pub mesh: Arc<MeshIndexer>,
    pub index_manager: IndexManager,
}

impl Dependencies {
    /// Initialize all dependencies from the given configuration.
    ///
    /// With search enabled the cluster must be reachable and healthy.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new(config: &IndexerConfig) -> Result<Self, IndexingError> {
        info!(
            search_enabled = config.search.is_enabled(),
            data_dir = %config.data_dir.display(),
            upload_limit = config.search.upload_limit,
            "Initializing dependencies"
        );

        let client = if config.search.is_enabled() {
            let search_client = OpenSearchClient::new(&config.search).map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
            })?;

            // Verify OpenSearch is reachable
            let healthy = search_client.health_check().await.map_err(|e| {
                IndexingError::config(format!("OpenSearch health check failed: {}", e))
            })?;
            if !healthy {
                return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
            }
            info!("OpenSearch connection verified");

            Some(Arc::new(search_client) as Arc<dyn SearchEngineClient>)
        } else {
            warn!("OPENSEARCH_URL is not set, search is disabled");
            None
        };

        let repository = JsonSnapshotRepository::load(&config.data_dir).await?;
        let files = Arc::new(LocalFileContentProvider::new(&config.data_dir));

        Ok(Self::wire(client, Arc::new(repository), files, config))
    }

    /// Build the indexers around an already constructed client.
    pub fn wire(
        client: Option<Arc<dyn SearchEngineClient>>,
        repository: Arc<dyn EntityRepository>,
        files: Arc<dyn FileContentProvider>,
        config: &IndexerConfig,
    ) -> Self {
        let learning_materials = Arc::new(LearningMaterialIndexer::new(
            client.clone(),
            files,
            &config.search,
        ));
        let curriculum = Arc::new(CurriculumIndexer::new(client.clone(), &config.search));
        let mesh = Arc::new(MeshIndexer::new(client.clone(), &config.search));
        let indexes: [&dyn SearchIndex; 3] = [&*learning_materials, &*curriculum, &*mesh];
        let index_manager = IndexManager::for_indexes(client.clone(), &indexes);
        Self {
            client,
            repository,
            learning_materials,
            curriculum,
            mesh,
            index_manager,
        }
    }

    /// Handler that routes messages to these indexers.
    pub fn message_handler(&self) -> Arc<IndexMessageHandler> {
        Arc::new(IndexMessageHandler::new(
            self.repository.clone(),
            self.learning_materials.clone(),
            self.curriculum.clone(),
            self.mesh.clone(),
        ))
    }

    /// Reconciliation driver dispatching through `dispatcher`.
    pub fn reconciliation_driver(
        &self,
        dispatcher: Arc<dyn MessageDispatcher>,
    ) -> ReconciliationDriver {
        ReconciliationDriver::new(
            self.repository.clone(),
            dispatcher,
            self.learning_materials.clone(),
            self.curriculum.clone(),
            self.mesh.clone(),
        )
    }
}
