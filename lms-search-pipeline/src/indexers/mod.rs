//! The concrete search indexes and their indexers.

mod curriculum;
mod learning_materials;
mod mesh;

pub use curriculum::{CourseSearchHit, CurriculumIndexer, CURRICULUM_INDEX, CURRICULUM_PIPELINE};
pub use learning_materials::{
    split_into_chunks, LearningMaterialIndexer, CHUNK_SIZE_RATIO, LEARNING_MATERIALS_INDEX,
};
pub use mesh::{MeshIndexer, MESH_INDEX};

use lms_search_shared::{EntityKind, IndexMapping, IndexableEntity, PipelineDefinition};

use crate::errors::PipelineError;

/// Static description of a search index: its name, schema and optional
/// ingest pipeline.
pub trait SearchIndex {
    fn index_name(&self) -> &str;

    fn mapping(&self) -> IndexMapping;

    fn pipeline(&self) -> Option<PipelineDefinition> {
        None
    }
}

/// Unwrap every entity as the variant `extract` accepts.
///
/// The first entity of another kind fails the whole call with
/// [`PipelineError::InvalidInput`].
pub(crate) fn expect_all<'a, T>(
    entities: &'a [IndexableEntity],
    expected: EntityKind,
    extract: impl Fn(&'a IndexableEntity) -> Option<T>,
) -> Result<Vec<T>, PipelineError> {
    entities
        .iter()
        .map(|entity| {
            extract(entity).ok_or(PipelineError::InvalidInput {
                expected,
                found: entity.kind(),
            })
        })
        .collect()
}
