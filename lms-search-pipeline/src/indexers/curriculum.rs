//! Curriculum index: one document per course session.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use lms_search_repository::{SearchConfig, SearchEngineClient};
use lms_search_shared::{
    CourseDocumentSource, EntityKind, IndexMapping, IndexableEntity, IngestStamp,
    PipelineDefinition,
};

use super::{expect_all, SearchIndex};
use crate::catalog::IndexedEntityCatalog;
use crate::errors::PipelineError;

pub const CURRICULUM_INDEX: &str = "lms-curriculum";
pub const CURRICULUM_PIPELINE: &str = "curriculum";

const COURSE_ID_FIELD: &str = "courseId";
const SESSION_ID_FIELD: &str = "sessionId";
const INGEST_TIME_FIELD: &str = "ingestTime";

/// Fields searched by [`CurriculumIndexer::search`], with boosts.
const SEARCH_FIELDS: [&str; 10] = [
    "courseTitle^3",
    "sessionTitle^3",
    "courseExternalId^2",
    "courseDirectors",
    "courseTerms",
    "courseObjectives",
    "courseMeshDescriptorNames",
    "sessionDescription",
    "sessionTerms",
    "sessionObjectives",
];

/// One course matched by a curriculum search, with the sessions that hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSearchHit {
    pub course_id: i64,
    pub title: String,
    pub school: String,
    pub year: Option<i64>,
    pub score: f64,
    pub session_ids: Vec<i64>,
}

pub struct CurriculumIndexer {
    catalog: IndexedEntityCatalog,
}

impl CurriculumIndexer {
    pub fn new(client: Option<Arc<dyn SearchEngineClient>>, config: &SearchConfig) -> Self {
        Self {
            catalog: IndexedEntityCatalog::new(
                client,
                CURRICULUM_INDEX,
                config.scroll_keep_alive.clone(),
            ),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.catalog.is_enabled()
    }

    /// Index composite courses.
    ///
    /// Courses whose documents were ingested at or after `stamp` are skipped
    /// without being expanded. Returns `Ok(false)` when the engine reports
    /// item failures.
    #[instrument(skip(self, courses, stamp), fields(count = courses.len()))]
    pub async fn index(
        &self,
        courses: &[IndexableEntity],
        stamp: &IngestStamp,
    ) -> Result<bool, PipelineError> {
        let courses: Vec<&Arc<dyn CourseDocumentSource>> =
            expect_all(courses, EntityKind::Course, |e| match e {
                IndexableEntity::Course(course) => Some(course),
                _ => None,
            })?;
        if !self.is_enabled() {
            return Err(PipelineError::SearchUnavailable);
        }

        let ids: Vec<i64> = courses.iter().map(|c| c.course_id()).collect();
        let skip = self
            .catalog
            .compute_skip_set(COURSE_ID_FIELD, &ids, Some((INGEST_TIME_FIELD, stamp)))
            .await?;

        let documents: Vec<_> = courses
            .iter()
            .filter(|c| !skip.contains(&c.course_id()))
            .flat_map(|c| c.create_index_objects())
            .collect();

        info!(
            skipped = skip.len(),
            documents = documents.len(),
            "Indexing courses"
        );
        self.catalog.bulk_index(documents).await
    }

    /// Every distinct course id in the index.
    pub async fn get_all_course_ids(&self) -> Result<Vec<i64>, PipelineError> {
        self.distinct_ids(COURSE_ID_FIELD).await
    }

    /// Every distinct session id in the index.
    pub async fn get_all_session_ids(&self) -> Result<Vec<i64>, PipelineError> {
        self.distinct_ids(SESSION_ID_FIELD).await
    }

    async fn distinct_ids(&self, field: &str) -> Result<Vec<i64>, PipelineError> {
        let mut ids: Vec<i64> = self.catalog.enumerate_all_ids(field).await?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Remove every session document of a course.
    pub async fn delete_course(&self, id: i64) -> Result<bool, PipelineError> {
        self.catalog.delete_by_field(COURSE_ID_FIELD, id).await
    }

    /// Remove the document of one session.
    pub async fn delete_session(&self, id: i64) -> Result<bool, PipelineError> {
        self.catalog.delete_by_field(SESSION_ID_FIELD, id).await
    }

    /// Full-text search, grouped by course in order of best score.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        text: &str,
        size: usize,
    ) -> Result<Vec<CourseSearchHit>, PipelineError> {
        let response = self
            .catalog
            .search(build_search_query(text, size))
            .await?;
        Ok(group_by_course(&response))
    }

    pub fn get_mapping() -> IndexMapping {
        let text = IndexMapping::multilingual_text;
        IndexMapping::new("2")
            .with_setting("default_pipeline", CURRICULUM_PIPELINE)
            .with_property("id", IndexMapping::keyword())
            .with_property(COURSE_ID_FIELD, IndexMapping::integer())
            .with_property("school", IndexMapping::keyword_text())
            .with_property("schoolId", IndexMapping::integer())
            .with_property("courseYear", IndexMapping::integer())
            .with_property("courseTitle", text())
            .with_property("courseExternalId", IndexMapping::keyword_text())
            .with_property("clerkshipType", IndexMapping::keyword_text())
            .with_property("courseDirectors", text())
            .with_property("courseAdministrators", text())
            .with_property("courseTerms", text())
            .with_property("courseObjectives", text())
            .with_property("courseMeshDescriptorIds", IndexMapping::keyword())
            .with_property("courseMeshDescriptorNames", text())
            .with_property("courseLearningMaterialTitles", text())
            .with_property("courseLearningMaterialDescriptions", text())
            .with_property("courseFileLearningMaterialIds", IndexMapping::integer())
            .with_property(SESSION_ID_FIELD, IndexMapping::integer())
            .with_property("sessionTitle", text())
            .with_property("sessionType", IndexMapping::keyword_text())
            .with_property("sessionDescription", text())
            .with_property("sessionObjectives", text())
            .with_property("sessionTerms", text())
            .with_property("sessionMeshDescriptorIds", IndexMapping::keyword())
            .with_property("sessionMeshDescriptorNames", text())
            .with_property("sessionLearningMaterialTitles", text())
            .with_property("sessionLearningMaterialDescriptions", text())
            .with_property("sessionFileLearningMaterialIds", IndexMapping::integer())
            .with_property(INGEST_TIME_FIELD, IndexMapping::date())
    }

    /// Server-side pipeline stamping each document with its ingest time.
    pub fn get_pipeline() -> PipelineDefinition {
        PipelineDefinition {
            id: CURRICULUM_PIPELINE.to_string(),
            body: json!({
                "description": "Records when a curriculum document was ingested",
                "processors": [
                    {
                        "set": {
                            "field": INGEST_TIME_FIELD,
                            "value": "{{_ingest.timestamp}}"
                        }
                    }
                ]
            }),
        }
    }
}

impl SearchIndex for CurriculumIndexer {
    fn index_name(&self) -> &str {
        self.catalog.index_name()
    }

    fn mapping(&self) -> IndexMapping {
        Self::get_mapping()
    }

    fn pipeline(&self) -> Option<PipelineDefinition> {
        Some(Self::get_pipeline())
    }
}

fn build_search_query(text: &str, size: usize) -> Value {
    json!({
        "query": {
            "multi_match": {
                "query": text,
                "type": "most_fields",
                "fields": SEARCH_FIELDS
            }
        },
        "_source": [COURSE_ID_FIELD, SESSION_ID_FIELD, "courseTitle", "school", "courseYear"],
        "size": size
    })
}

fn group_by_course(response: &Value) -> Vec<CourseSearchHit> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut order: Vec<i64> = Vec::new();
    let mut courses: HashMap<i64, CourseSearchHit> = HashMap::new();
    for hit in hits {
        let Some(source) = hit.get("_source") else {
            continue;
        };
        let Some(course_id) = source.get(COURSE_ID_FIELD).and_then(Value::as_i64) else {
            continue;
        };
        let score = hit.get("_score").and_then(Value::as_f64).unwrap_or_default();

        let entry = courses.entry(course_id).or_insert_with(|| {
            order.push(course_id);
            CourseSearchHit {
                course_id,
                title: string_field(source, "courseTitle"),
                school: string_field(source, "school"),
                year: source.get("courseYear").and_then(Value::as_i64),
                score,
                session_ids: Vec::new(),
            }
        });
        entry.score = entry.score.max(score);
        if let Some(session_id) = source.get(SESSION_ID_FIELD).and_then(Value::as_i64) {
            entry.session_ids.push(session_id);
        }
    }

    order
        .into_iter()
        .filter_map(|id| courses.remove(&id))
        .collect()
}

fn string_field(source: &Value, field: &str) -> String {
    source
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
