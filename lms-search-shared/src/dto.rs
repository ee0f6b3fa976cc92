//! Read-only entity projections supplied by the persistence layer.
//!
//! DTOs are owned by the caller and treated as immutable for the duration of
//! an indexing call.

use serde::{Deserialize, Serialize};

/// A learning material with an optional uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningMaterialDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Path of the uploaded file relative to the storage root. Links and
    /// citations have none.
    #[serde(default)]
    pub relative_path: Option<String>,
}

/// Course-level data that is copied onto every curriculum document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseDto {
    pub id: i64,
    pub title: String,
    pub school_id: i64,
    pub school_title: String,
    pub year: i32,
    pub external_id: Option<String>,
    pub clerkship_type: Option<String>,
    pub directors: Vec<String>,
    pub administrators: Vec<String>,
    pub terms: Vec<String>,
    pub objectives: Vec<String>,
    pub mesh_descriptor_ids: Vec<String>,
    pub mesh_descriptor_names: Vec<String>,
    pub learning_material_titles: Vec<String>,
    pub learning_material_descriptions: Vec<String>,
    pub file_learning_material_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionDto {
    pub id: i64,
    pub title: String,
    pub session_type: String,
    pub description: Option<String>,
    pub objectives: Vec<String>,
    pub terms: Vec<String>,
    pub mesh_descriptor_ids: Vec<String>,
    pub mesh_descriptor_names: Vec<String>,
    pub learning_material_titles: Vec<String>,
    pub learning_material_descriptions: Vec<String>,
    pub file_learning_material_ids: Vec<i64>,
}

/// A controlled-vocabulary descriptor together with its concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshDescriptorDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub previous_indexing: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<MeshConceptDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConceptDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scope_note: Option<String>,
    #[serde(default)]
    pub casn1_name: Option<String>,
    #[serde(default)]
    pub terms: Vec<MeshTermDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshTermDto {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_material_from_camel_case_json() {
        let dto: LearningMaterialDto = serde_json::from_str(
            r#"{"id": 7, "title": "Week 1", "filename": "w1.pdf", "relativePath": "ab/cd/w1"}"#,
        )
        .unwrap();

        assert_eq!(dto.id, 7);
        assert_eq!(dto.relative_path.as_deref(), Some("ab/cd/w1"));
        assert!(dto.description.is_none());
    }

    #[test]
    fn test_course_defaults_missing_lists() {
        let dto: CourseDto =
            serde_json::from_str(r#"{"id": 3, "title": "Anatomy", "year": 2024}"#).unwrap();

        assert_eq!(dto.id, 3);
        assert!(dto.directors.is_empty());
        assert!(dto.file_learning_material_ids.is_empty());
    }
}
