//! # LMS Search Pipeline
//!
//! This crate turns learning-management entities into search documents and
//! keeps the search indexes in line with the source of truth.
//!
//! ## Architecture
//!
//! 1. **Catalog**: Per-index plumbing (skip sets, bulk writes, scrolling)
//! 2. **Indexers**: Learning materials, curriculum and MeSH descriptors
//! 3. **Handlers**: Load entities for an index or delete request
//! 4. **Orchestrator**: Carries requests to a background worker
//! 5. **Reconciliation**: Finds what is missing or stale and queues requests

pub mod catalog;
pub mod content;
pub mod errors;
pub mod handlers;
pub mod index_manager;
pub mod indexers;
pub mod messages;
pub mod orchestrator;
pub mod reconciliation;
pub mod repository;
pub mod sanitizer;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::IndexedEntityCatalog;
pub use content::{FileContentProvider, LocalFileContentProvider};
pub use errors::PipelineError;
pub use handlers::IndexMessageHandler;
pub use index_manager::{IndexDefinition, IndexManager};
pub use indexers::{CurriculumIndexer, LearningMaterialIndexer, MeshIndexer, SearchIndex};
pub use messages::IndexMessage;
pub use orchestrator::{ChannelDispatcher, IndexWorker, MessageDispatcher, WorkerSummary};
pub use reconciliation::{ReconciliationDriver, ReconciliationMode, ReconciliationReport};
pub use repository::{EntityRepository, JsonSnapshotRepository};
pub use sanitizer::TextSanitizer;
