//! Access to the extracted text of uploaded learning material files.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::PipelineError;

/// Directory, relative to the storage root, holding extracted file text.
pub const LEARNING_MATERIAL_TEXT_DIR: &str = "learning_material_texts";

/// Reads file contents by storage path.
#[async_trait]
pub trait FileContentProvider: Send + Sync {
    /// Contents at `path`, or `None` when no file exists there.
    async fn get_file_contents(&self, path: &str) -> Result<Option<Vec<u8>>, PipelineError>;

    /// Storage path of the extracted text for a material's relative path.
    fn learning_material_text_path(&self, relative_path: &str) -> String {
        format!("{}/{}", LEARNING_MATERIAL_TEXT_DIR, relative_path)
    }
}

/// Reads contents from a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileContentProvider {
    root: PathBuf,
}

impl LocalFileContentProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, PipelineError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(PipelineError::content(format!(
                "Refusing to read outside the storage root: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileContentProvider for LocalFileContentProvider {
    async fn get_file_contents(&self, path: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %full.display(), "No extracted text on disk");
                Ok(None)
            }
            Err(e) => Err(PipelineError::content(format!(
                "Failed to read {}: {}",
                full.display(),
                e
            ))),
        }
    }
}
