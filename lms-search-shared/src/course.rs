//! Composite course objects.
//!
//! A composite course expands one course into several curriculum documents,
//! one per session, each repeating the course-level fields so that a hit on
//! any session can be grouped back to its course.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::IndexDocument;
use crate::dto::{CourseDto, SessionDto};

/// Anything that can expand a course into curriculum documents.
pub trait CourseDocumentSource: fmt::Debug + Send + Sync {
    /// Id of the course this object describes.
    fn course_id(&self) -> i64;

    /// Build the curriculum documents for the course. May be empty.
    fn create_index_objects(&self) -> Vec<IndexDocument>;
}

/// A course together with its sessions, as loaded from the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexableCourse {
    pub course: CourseDto,
    #[serde(default)]
    pub sessions: Vec<SessionDto>,
}

impl IndexableCourse {
    pub fn new(course: CourseDto, sessions: Vec<SessionDto>) -> Self {
        Self { course, sessions }
    }

    /// Document id for a course/session pair.
    pub fn document_id(course_id: i64, session_id: i64) -> String {
        format!("course_{}_session_{}", course_id, session_id)
    }

    fn course_document(&self, id: String) -> IndexDocument {
        let c = &self.course;
        IndexDocument::new(id)
            .with_field("courseId", c.id)
            .with_field("school", c.school_title.clone())
            .with_field("schoolId", c.school_id)
            .with_field("courseYear", c.year)
            .with_field("courseTitle", c.title.clone())
            .with_field("courseExternalId", c.external_id.clone())
            .with_field("clerkshipType", c.clerkship_type.clone())
            .with_field("courseDirectors", c.directors.clone())
            .with_field("courseAdministrators", c.administrators.clone())
            .with_field("courseTerms", c.terms.clone())
            .with_field("courseObjectives", c.objectives.clone())
            .with_field("courseMeshDescriptorIds", c.mesh_descriptor_ids.clone())
            .with_field("courseMeshDescriptorNames", c.mesh_descriptor_names.clone())
            .with_field(
                "courseLearningMaterialTitles",
                c.learning_material_titles.clone(),
            )
            .with_field(
                "courseLearningMaterialDescriptions",
                c.learning_material_descriptions.clone(),
            )
            .with_field(
                "courseFileLearningMaterialIds",
                c.file_learning_material_ids.clone(),
            )
    }
}

impl CourseDocumentSource for IndexableCourse {
    fn course_id(&self) -> i64 {
        self.course.id
    }

    fn create_index_objects(&self) -> Vec<IndexDocument> {
        self.sessions
            .iter()
            .map(|s| {
                self.course_document(Self::document_id(self.course.id, s.id))
                    .with_field("sessionId", s.id)
                    .with_field("sessionTitle", s.title.clone())
                    .with_field("sessionType", s.session_type.clone())
                    .with_field("sessionDescription", s.description.clone())
                    .with_field("sessionObjectives", s.objectives.clone())
                    .with_field("sessionTerms", s.terms.clone())
                    .with_field("sessionMeshDescriptorIds", s.mesh_descriptor_ids.clone())
                    .with_field(
                        "sessionMeshDescriptorNames",
                        s.mesh_descriptor_names.clone(),
                    )
                    .with_field(
                        "sessionLearningMaterialTitles",
                        s.learning_material_titles.clone(),
                    )
                    .with_field(
                        "sessionLearningMaterialDescriptions",
                        s.learning_material_descriptions.clone(),
                    )
                    .with_field(
                        "sessionFileLearningMaterialIds",
                        s.file_learning_material_ids.clone(),
                    )
            })
            .collect()
    }
}
