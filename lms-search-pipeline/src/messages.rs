//! Work items handed to background index workers.
//!
//! Index requests carry batches of ids and are capped at
//! [`MAX_IDS_PER_MESSAGE`] so that one worker turn stays small. Delete
//! requests carry a single id.

use serde::{Deserialize, Serialize};

use lms_search_shared::IngestStamp;

use crate::errors::PipelineError;

/// Largest batch of ids a single index request may carry.
pub const MAX_IDS_PER_MESSAGE: usize = 50;

fn check_size<K>(ids: &[K]) -> Result<(), PipelineError> {
    if ids.len() > MAX_IDS_PER_MESSAGE {
        return Err(PipelineError::MessageTooLarge {
            max: MAX_IDS_PER_MESSAGE,
            provided: ids.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningMaterialIndexRequest {
    ids: Vec<i64>,
    force: bool,
}

impl LearningMaterialIndexRequest {
    pub fn new(ids: Vec<i64>, force: bool) -> Result<Self, PipelineError> {
        check_size(&ids)?;
        Ok(Self { ids, force })
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn force(&self) -> bool {
        self.force
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseIndexRequest {
    ids: Vec<i64>,
    stamp: IngestStamp,
}

impl CourseIndexRequest {
    /// Request indexing of courses; `stamp` marks the start of the run.
    pub fn new(ids: Vec<i64>, stamp: IngestStamp) -> Result<Self, PipelineError> {
        check_size(&ids)?;
        Ok(Self { ids, stamp })
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn stamp(&self) -> &IngestStamp {
        &self.stamp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshDescriptorIndexRequest {
    ids: Vec<String>,
    stamp: IngestStamp,
}

impl MeshDescriptorIndexRequest {
    pub fn new(ids: Vec<String>, stamp: IngestStamp) -> Result<Self, PipelineError> {
        check_size(&ids)?;
        Ok(Self { ids, stamp })
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn stamp(&self) -> &IngestStamp {
        &self.stamp
    }
}

/// Everything a worker can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexMessage {
    IndexLearningMaterials(LearningMaterialIndexRequest),
    IndexCourses(CourseIndexRequest),
    IndexMeshDescriptors(MeshDescriptorIndexRequest),
    DeleteLearningMaterial { id: i64 },
    DeleteCourse { id: i64 },
    DeleteSession { id: i64 },
    DeleteMeshDescriptor { id: String },
}

impl IndexMessage {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IndexLearningMaterials(_) => "index_learning_materials",
            Self::IndexCourses(_) => "index_courses",
            Self::IndexMeshDescriptors(_) => "index_mesh_descriptors",
            Self::DeleteLearningMaterial { .. } => "delete_learning_material",
            Self::DeleteCourse { .. } => "delete_course",
            Self::DeleteSession { .. } => "delete_session",
            Self::DeleteMeshDescriptor { .. } => "delete_mesh_descriptor",
        }
    }
}

impl From<LearningMaterialIndexRequest> for IndexMessage {
    fn from(request: LearningMaterialIndexRequest) -> Self {
        Self::IndexLearningMaterials(request)
    }
}

impl From<CourseIndexRequest> for IndexMessage {
    fn from(request: CourseIndexRequest) -> Self {
        Self::IndexCourses(request)
    }
}

impl From<MeshDescriptorIndexRequest> for IndexMessage {
    fn from(request: MeshDescriptorIndexRequest) -> Self {
        Self::IndexMeshDescriptors(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_at_limit_is_accepted() {
        let ids: Vec<i64> = (1..=50).collect();

        let request = LearningMaterialIndexRequest::new(ids, false).unwrap();

        assert_eq!(request.ids().len(), 50);
        assert!(!request.force());
    }

    #[test]
    fn test_request_over_limit_is_rejected() {
        let ids: Vec<i64> = (1..=51).collect();

        let err = CourseIndexRequest::new(ids, IngestStamp::now()).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::MessageTooLarge {
                max: 50,
                provided: 51
            }
        ));
    }

    #[test]
    fn test_message_serializes_with_type_tag() {
        let message = IndexMessage::DeleteSession { id: 12 };

        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value, serde_json::json!({"type": "delete_session", "id": 12}));
        assert_eq!(message.kind(), "delete_session");
    }
}
