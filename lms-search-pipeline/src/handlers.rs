//! Message handlers: load entities and hand them to the right indexer.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use lms_search_shared::{CourseDocumentSource, IndexableEntity};

use crate::errors::PipelineError;
use crate::indexers::{CurriculumIndexer, LearningMaterialIndexer, MeshIndexer};
use crate::messages::IndexMessage;
use crate::repository::EntityRepository;

/// Routes each [`IndexMessage`] to its indexer.
pub struct IndexMessageHandler {
    repository: Arc<dyn EntityRepository>,
    learning_materials: Arc<LearningMaterialIndexer>,
    curriculum: Arc<CurriculumIndexer>,
    mesh: Arc<MeshIndexer>,
}

impl IndexMessageHandler {
    pub fn new(
        repository: Arc<dyn EntityRepository>,
        learning_materials: Arc<LearningMaterialIndexer>,
        curriculum: Arc<CurriculumIndexer>,
        mesh: Arc<MeshIndexer>,
    ) -> Self {
        Self {
            repository,
            learning_materials,
            curriculum,
            mesh,
        }
    }

    /// Handle one message.
    ///
    /// Returns `Ok(false)` when the engine reported item failures for the
    /// batch or a delete did not complete cleanly.
    #[instrument(skip(self, message), fields(kind = message.kind()))]
    pub async fn handle(&self, message: IndexMessage) -> Result<bool, PipelineError> {
        let ok = match message {
            IndexMessage::IndexLearningMaterials(request) => {
                let materials: Vec<IndexableEntity> = self
                    .repository
                    .find_learning_materials(request.ids())
                    .await?
                    .into_iter()
                    .map(IndexableEntity::from)
                    .collect();
                self.learning_materials
                    .index(&materials, request.force())
                    .await?
            }
            IndexMessage::IndexCourses(request) => {
                let courses: Vec<IndexableEntity> = self
                    .repository
                    .find_courses(request.ids())
                    .await?
                    .into_iter()
                    .map(|course| {
                        let source: Arc<dyn CourseDocumentSource> = Arc::new(course);
                        IndexableEntity::Course(source)
                    })
                    .collect();
                self.curriculum.index(&courses, request.stamp()).await?
            }
            IndexMessage::IndexMeshDescriptors(request) => {
                let descriptors: Vec<IndexableEntity> = self
                    .repository
                    .find_mesh_descriptors(request.ids())
                    .await?
                    .into_iter()
                    .map(IndexableEntity::from)
                    .collect();
                self.mesh.index(&descriptors, request.stamp()).await?
            }
            IndexMessage::DeleteLearningMaterial { id } => self.learning_materials.delete(id).await?,
            IndexMessage::DeleteCourse { id } => self.curriculum.delete_course(id).await?,
            IndexMessage::DeleteSession { id } => self.curriculum.delete_session(id).await?,
            IndexMessage::DeleteMeshDescriptor { id } => self.mesh.delete(&id).await?,
        };

        if ok {
            info!("Message handled");
        } else {
            warn!("Message handled with engine-reported failures");
        }
        Ok(ok)
    }
}
