//! # LMS Search Shared
//!
//! Plain data types shared by the search indexing crates: the documents that
//! are written to the search engine, the bulk operations that carry them, the
//! entity projections supplied by the persistence layer and the static index
//! schema descriptors.

pub mod bulk;
pub mod course;
pub mod document;
pub mod dto;
pub mod entity;
pub mod ids;
pub mod mapping;
pub mod stamp;

pub use bulk::{BulkAction, BulkOperation};
pub use course::{CourseDocumentSource, IndexableCourse};
pub use document::IndexDocument;
pub use dto::{
    CourseDto, LearningMaterialDto, MeshConceptDto, MeshDescriptorDto, MeshTermDto, SessionDto,
};
pub use entity::{EntityKind, IndexableEntity};
pub use ids::{CatalogKey, SkipSet};
pub use mapping::{IndexMapping, PipelineDefinition};
pub use stamp::IngestStamp;
