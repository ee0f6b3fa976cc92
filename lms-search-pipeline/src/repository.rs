//! Loading entities to index from the persistence layer.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use lms_search_shared::{IndexableCourse, LearningMaterialDto, MeshDescriptorDto};

use crate::errors::PipelineError;

pub const LEARNING_MATERIALS_FILE: &str = "learning_materials.json";
pub const COURSES_FILE: &str = "courses.json";
pub const MESH_DESCRIPTORS_FILE: &str = "mesh_descriptors.json";

/// Source of the entities the indexers write.
///
/// `find_*` methods return matches in repository order and silently omit
/// unknown ids.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    async fn find_learning_materials(
        &self,
        ids: &[i64],
    ) -> Result<Vec<LearningMaterialDto>, PipelineError>;

    async fn find_courses(&self, ids: &[i64]) -> Result<Vec<IndexableCourse>, PipelineError>;

    async fn find_mesh_descriptors(
        &self,
        ids: &[String],
    ) -> Result<Vec<MeshDescriptorDto>, PipelineError>;

    /// Ids of materials backed by an uploaded file.
    async fn file_learning_material_ids(&self) -> Result<Vec<i64>, PipelineError>;

    async fn course_ids(&self) -> Result<Vec<i64>, PipelineError>;

    /// `(session id, course id)` for every session.
    async fn session_course_ids(&self) -> Result<Vec<(i64, i64)>, PipelineError>;

    async fn mesh_descriptor_ids(&self) -> Result<Vec<String>, PipelineError>;
}

/// Entities read once from JSON snapshot files in a data directory.
#[derive(Debug, Clone, Default)]
pub struct JsonSnapshotRepository {
    learning_materials: Vec<LearningMaterialDto>,
    courses: Vec<IndexableCourse>,
    mesh_descriptors: Vec<MeshDescriptorDto>,
}

impl JsonSnapshotRepository {
    pub fn new(
        learning_materials: Vec<LearningMaterialDto>,
        courses: Vec<IndexableCourse>,
        mesh_descriptors: Vec<MeshDescriptorDto>,
    ) -> Self {
        Self {
            learning_materials,
            courses,
            mesh_descriptors,
        }
    }

    /// Load all snapshot files from `dir`. A missing file is an empty list.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let dir = dir.as_ref();
        let repository = Self {
            learning_materials: read_snapshot(&dir.join(LEARNING_MATERIALS_FILE)).await?,
            courses: read_snapshot(&dir.join(COURSES_FILE)).await?,
            mesh_descriptors: read_snapshot(&dir.join(MESH_DESCRIPTORS_FILE)).await?,
        };
        info!(
            dir = %dir.display(),
            learning_materials = repository.learning_materials.len(),
            courses = repository.courses.len(),
            mesh_descriptors = repository.mesh_descriptors.len(),
            "Loaded entity snapshots"
        );
        Ok(repository)
    }
}

async fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Snapshot file not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(PipelineError::repository(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        PipelineError::repository(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn select<T: Clone, K: Eq + std::hash::Hash>(
    items: &[T],
    ids: &[K],
    key: impl Fn(&T) -> &K,
) -> Vec<T> {
    let wanted: HashSet<&K> = ids.iter().collect();
    items
        .iter()
        .filter(|item| wanted.contains(key(*item)))
        .cloned()
        .collect()
}

#[async_trait]
impl EntityRepository for JsonSnapshotRepository {
    async fn find_learning_materials(
        &self,
        ids: &[i64],
    ) -> Result<Vec<LearningMaterialDto>, PipelineError> {
        Ok(select(&self.learning_materials, ids, |m| &m.id))
    }

    async fn find_courses(&self, ids: &[i64]) -> Result<Vec<IndexableCourse>, PipelineError> {
        Ok(select(&self.courses, ids, |c| &c.course.id))
    }

    async fn find_mesh_descriptors(
        &self,
        ids: &[String],
    ) -> Result<Vec<MeshDescriptorDto>, PipelineError> {
        Ok(select(&self.mesh_descriptors, ids, |d| &d.id))
    }

    async fn file_learning_material_ids(&self) -> Result<Vec<i64>, PipelineError> {
        Ok(self
            .learning_materials
            .iter()
            .filter(|m| m.relative_path.is_some())
            .map(|m| m.id)
            .collect())
    }

    async fn course_ids(&self) -> Result<Vec<i64>, PipelineError> {
        Ok(self.courses.iter().map(|c| c.course.id).collect())
    }

    async fn session_course_ids(&self) -> Result<Vec<(i64, i64)>, PipelineError> {
        Ok(self
            .courses
            .iter()
            .flat_map(|c| c.sessions.iter().map(move |s| (s.id, c.course.id)))
            .collect())
    }

    async fn mesh_descriptor_ids(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.mesh_descriptors.iter().map(|d| d.id.clone()).collect())
    }
}
