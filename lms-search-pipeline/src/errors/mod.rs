//! Error types for the indexing pipeline.

use lms_search_repository::SearchError;
use lms_search_shared::EntityKind;
use thiserror::Error;

/// Errors that can occur while building, writing or reconciling index data.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An indexing call was made while no search engine is configured.
    #[error("Search is not configured, there is nothing to index into")]
    SearchUnavailable,

    /// An indexer was handed an entity of the wrong kind.
    #[error("Expected {expected}, found {found}")]
    InvalidInput {
        expected: EntityKind,
        found: EntityKind,
    },

    /// Text cleanup failed for one entity.
    #[error("Unable to normalize text for {entity_id}: {message}")]
    TextNormalization { entity_id: String, message: String },

    /// The search engine rejected or failed a request.
    #[error("Search error: {0}")]
    EngineRequest(#[from] SearchError),

    /// Reading extracted file text failed.
    #[error("Content provider error: {0}")]
    ContentProviderError(String),

    /// Loading entities from the persistence layer failed.
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// A message could not be handed to a worker.
    #[error("Dispatch error: {0}")]
    DispatchError(String),

    /// A message carries more ids than a worker accepts at once.
    #[error("Message carries {provided} ids, at most {max} are allowed")]
    MessageTooLarge { max: usize, provided: usize },
}

impl PipelineError {
    /// Create a content provider error.
    pub fn content(msg: impl Into<String>) -> Self {
        Self::ContentProviderError(msg.into())
    }

    /// Create a repository error.
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::RepositoryError(msg.into())
    }

    /// Create a dispatch error.
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::DispatchError(msg.into())
    }

    /// Create a text normalization error for `entity_id`.
    pub fn text_normalization(entity_id: impl ToString, msg: impl Into<String>) -> Self {
        Self::TextNormalization {
            entity_id: entity_id.to_string(),
            message: msg.into(),
        }
    }
}
