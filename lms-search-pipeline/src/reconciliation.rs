//! Bringing the search indexes back in line with the source of truth.
//!
//! A full run queues every known entity for indexing. An incremental run
//! compares the ids present in each index with the ids the repository knows
//! about, queues the missing ones and queues deletes for the ones that no
//! longer exist.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use tracing::{info, instrument};

use lms_search_shared::IngestStamp;

use crate::errors::PipelineError;
use crate::indexers::{CurriculumIndexer, LearningMaterialIndexer, MeshIndexer};
use crate::messages::{
    CourseIndexRequest, IndexMessage, LearningMaterialIndexRequest, MeshDescriptorIndexRequest,
    MAX_IDS_PER_MESSAGE,
};
use crate::orchestrator::MessageDispatcher;
use crate::repository::EntityRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationMode {
    Full,
    Incremental,
}

/// What was queued for one entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Ids queued for indexing.
    pub queued: usize,
    /// Ids queued for deletion.
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub mode: ReconciliationMode,
    pub learning_materials: EntityCounts,
    pub courses: EntityCounts,
    pub sessions: EntityCounts,
    pub mesh_descriptors: EntityCounts,
    /// Messages handed to the dispatcher.
    pub messages: usize,
}

impl ReconciliationReport {
    fn new(mode: ReconciliationMode) -> Self {
        Self {
            mode,
            learning_materials: EntityCounts::default(),
            courses: EntityCounts::default(),
            sessions: EntityCounts::default(),
            mesh_descriptors: EntityCounts::default(),
            messages: 0,
        }
    }
}

pub struct ReconciliationDriver {
    repository: Arc<dyn EntityRepository>,
    dispatcher: Arc<dyn MessageDispatcher>,
    learning_materials: Arc<LearningMaterialIndexer>,
    curriculum: Arc<CurriculumIndexer>,
    mesh: Arc<MeshIndexer>,
}

impl ReconciliationDriver {
    pub fn new(
        repository: Arc<dyn EntityRepository>,
        dispatcher: Arc<dyn MessageDispatcher>,
        learning_materials: Arc<LearningMaterialIndexer>,
        curriculum: Arc<CurriculumIndexer>,
        mesh: Arc<MeshIndexer>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            learning_materials,
            curriculum,
            mesh,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, mode: ReconciliationMode) -> Result<ReconciliationReport, PipelineError> {
        if !self.learning_materials.is_enabled() {
            return Err(PipelineError::SearchUnavailable);
        }

        let mut report = ReconciliationReport::new(mode);
        let stamp = IngestStamp::now();
        match mode {
            ReconciliationMode::Full => self.full(&stamp, &mut report).await?,
            ReconciliationMode::Incremental => self.incremental(&stamp, &mut report).await?,
        }

        info!(
            messages = report.messages,
            learning_materials = report.learning_materials.queued,
            courses = report.courses.queued,
            mesh_descriptors = report.mesh_descriptors.queued,
            removed = report.learning_materials.removed
                + report.courses.removed
                + report.sessions.removed
                + report.mesh_descriptors.removed,
            "Reconciliation queued"
        );
        Ok(report)
    }

    async fn full(
        &self,
        stamp: &IngestStamp,
        report: &mut ReconciliationReport,
    ) -> Result<(), PipelineError> {
        let materials = self.repository.file_learning_material_ids().await?;
        report.learning_materials.queued = materials.len();
        report.messages += self.queue_materials(materials, true).await?;

        let courses = self.repository.course_ids().await?;
        report.courses.queued = courses.len();
        report.messages += self.queue_courses(courses, stamp).await?;

        let descriptors = self.repository.mesh_descriptor_ids().await?;
        report.mesh_descriptors.queued = descriptors.len();
        report.messages += self.queue_descriptors(descriptors, stamp).await?;
        Ok(())
    }

    async fn incremental(
        &self,
        stamp: &IngestStamp,
        report: &mut ReconciliationReport,
    ) -> Result<(), PipelineError> {
        let (missing, stale) = diff(
            self.repository.file_learning_material_ids().await?,
            self.learning_materials.get_all_ids().await?,
        );
        report.learning_materials = EntityCounts {
            queued: missing.len(),
            removed: stale.len(),
        };
        report.messages += self.queue_materials(missing, false).await?;
        for id in stale {
            self.send(IndexMessage::DeleteLearningMaterial { id }, report).await?;
        }

        let (missing_courses, stale_courses) = diff(
            self.repository.course_ids().await?,
            self.curriculum.get_all_course_ids().await?,
        );
        let sessions = self.repository.session_course_ids().await?;
        let (missing_sessions, stale_sessions) = diff(
            sessions.iter().map(|(session, _)| *session).collect(),
            self.curriculum.get_all_session_ids().await?,
        );
        let session_courses: HashMap<i64, i64> = sessions.into_iter().collect();

        // Missing sessions are indexed through their course.
        let mut courses = missing_courses;
        let mut queued: HashSet<i64> = courses.iter().copied().collect();
        for session in &missing_sessions {
            if let Some(&course) = session_courses.get(session) {
                if queued.insert(course) {
                    courses.push(course);
                }
            }
        }
        report.courses = EntityCounts {
            queued: courses.len(),
            removed: stale_courses.len(),
        };
        report.sessions = EntityCounts {
            queued: missing_sessions.len(),
            removed: stale_sessions.len(),
        };
        report.messages += self.queue_courses(courses, stamp).await?;
        for id in stale_courses {
            self.send(IndexMessage::DeleteCourse { id }, report).await?;
        }
        for id in stale_sessions {
            self.send(IndexMessage::DeleteSession { id }, report).await?;
        }

        let (missing, stale) = diff(
            self.repository.mesh_descriptor_ids().await?,
            self.mesh.get_all_ids().await?,
        );
        report.mesh_descriptors = EntityCounts {
            queued: missing.len(),
            removed: stale.len(),
        };
        report.messages += self.queue_descriptors(missing, stamp).await?;
        for id in stale {
            self.send(IndexMessage::DeleteMeshDescriptor { id }, report).await?;
        }
        Ok(())
    }

    async fn send(
        &self,
        message: IndexMessage,
        report: &mut ReconciliationReport,
    ) -> Result<(), PipelineError> {
        self.dispatcher.dispatch(message).await?;
        report.messages += 1;
        Ok(())
    }

    async fn queue_materials(&self, ids: Vec<i64>, force: bool) -> Result<usize, PipelineError> {
        let mut sent = 0;
        for batch in ids.chunks(MAX_IDS_PER_MESSAGE) {
            let request = LearningMaterialIndexRequest::new(batch.to_vec(), force)?;
            self.dispatcher.dispatch(request.into()).await?;
            sent += 1;
        }
        Ok(sent)
    }

    async fn queue_courses(&self, ids: Vec<i64>, stamp: &IngestStamp) -> Result<usize, PipelineError> {
        let mut sent = 0;
        for batch in ids.chunks(MAX_IDS_PER_MESSAGE) {
            let request = CourseIndexRequest::new(batch.to_vec(), *stamp)?;
            self.dispatcher.dispatch(request.into()).await?;
            sent += 1;
        }
        Ok(sent)
    }

    async fn queue_descriptors(
        &self,
        ids: Vec<String>,
        stamp: &IngestStamp,
    ) -> Result<usize, PipelineError> {
        let mut sent = 0;
        for batch in ids.chunks(MAX_IDS_PER_MESSAGE) {
            let request = MeshDescriptorIndexRequest::new(batch.to_vec(), *stamp)?;
            self.dispatcher.dispatch(request.into()).await?;
            sent += 1;
        }
        Ok(sent)
    }
}

/// Split into (in source but not indexed, indexed but not in source), each
/// keeping its input order.
fn diff<K: Eq + Hash + Clone>(source: Vec<K>, indexed: Vec<K>) -> (Vec<K>, Vec<K>) {
    let source_set: HashSet<K> = source.iter().cloned().collect();
    let indexed_set: HashSet<K> = indexed.iter().cloned().collect();
    let missing = source
        .into_iter()
        .filter(|id| !indexed_set.contains(id))
        .collect();
    let stale = indexed
        .into_iter()
        .filter(|id| !source_set.contains(id))
        .collect();
    (missing, stale)
}
