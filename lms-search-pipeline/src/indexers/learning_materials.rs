//! Learning material index.
//!
//! Every file-backed material becomes one or more documents: the extracted
//! file text is cleaned and split into chunks small enough to upload, and
//! each chunk repeats the material's title, description and filename.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use lms_search_repository::{SearchConfig, SearchEngineClient};
use lms_search_shared::{
    EntityKind, IndexDocument, IndexMapping, IndexableEntity, LearningMaterialDto, SkipSet,
};

use super::{expect_all, SearchIndex};
use crate::catalog::IndexedEntityCatalog;
use crate::content::FileContentProvider;
use crate::errors::PipelineError;
use crate::sanitizer::TextSanitizer;

pub const LEARNING_MATERIALS_INDEX: &str = "lms-learning-materials";

/// Share of the upload limit a single chunk of file text may take.
pub const CHUNK_SIZE_RATIO: f64 = 0.6;

const ID_FIELD: &str = "learningMaterialId";

pub struct LearningMaterialIndexer {
    catalog: IndexedEntityCatalog,
    files: Arc<dyn FileContentProvider>,
    sanitizer: TextSanitizer,
    max_chunk_size: usize,
}

impl LearningMaterialIndexer {
    pub fn new(
        client: Option<Arc<dyn SearchEngineClient>>,
        files: Arc<dyn FileContentProvider>,
        config: &SearchConfig,
    ) -> Self {
        let max_chunk_size = ((config.upload_limit as f64) * CHUNK_SIZE_RATIO).floor() as usize;
        Self {
            catalog: IndexedEntityCatalog::new(
                client,
                LEARNING_MATERIALS_INDEX,
                config.scroll_keep_alive.clone(),
            ),
            files,
            sanitizer: TextSanitizer::new(),
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.catalog.is_enabled()
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Document id of one chunk of a material.
    pub fn document_id(chunk: usize, material_id: i64) -> String {
        format!("lm_{}_{}", chunk, material_id)
    }

    /// Index learning materials.
    ///
    /// Materials already present in the index are skipped unless `force` is
    /// set. Returns `Ok(false)` when the engine reports item failures.
    #[instrument(skip(self, materials), fields(count = materials.len()))]
    pub async fn index(
        &self,
        materials: &[IndexableEntity],
        force: bool,
    ) -> Result<bool, PipelineError> {
        if !self.is_enabled() {
            return Err(PipelineError::SearchUnavailable);
        }
        let materials = expect_all(materials, EntityKind::LearningMaterial, |e| match e {
            IndexableEntity::LearningMaterial(dto) => Some(dto),
            _ => None,
        })?;

        let skip = if force {
            SkipSet::empty()
        } else {
            let ids: Vec<i64> = materials.iter().map(|m| m.id).collect();
            self.catalog.compute_skip_set(ID_FIELD, &ids, None).await?
        };

        let mut documents = Vec::new();
        for material in materials.into_iter().filter(|m| !skip.contains(&m.id)) {
            let contents = match &material.relative_path {
                Some(relative) => {
                    let path = self.files.learning_material_text_path(relative);
                    self.files.get_file_contents(&path).await?
                }
                None => None,
            };
            documents.extend(self.build_documents(material, contents)?);
        }

        info!(
            skipped = skip.len(),
            documents = documents.len(),
            "Indexing learning materials"
        );
        self.catalog.bulk_index(documents).await
    }

    fn build_documents(
        &self,
        material: &LearningMaterialDto,
        contents: Option<Vec<u8>>,
    ) -> Result<Vec<IndexDocument>, PipelineError> {
        let bytes: &[u8] = match &contents {
            Some(bytes) => bytes,
            None => &[],
        };
        let chunks = split_into_chunks(bytes, self.max_chunk_size);
        debug!(material_id = material.id, chunks = chunks.len(), "Split file text");

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let text = String::from_utf8_lossy(chunk);
                let cleaned = self.sanitizer.clean(material.id, &text)?;
                Ok(IndexDocument::new(Self::document_id(i, material.id))
                    .with_field(ID_FIELD, material.id)
                    .with_field("title", material.title.clone())
                    .with_field("description", material.description.clone())
                    .with_field("filename", material.filename.clone())
                    .with_field("contents", cleaned))
            })
            .collect()
    }

    /// Every distinct material id in the index.
    pub async fn get_all_ids(&self) -> Result<Vec<i64>, PipelineError> {
        let mut ids: Vec<i64> = self.catalog.enumerate_all_ids(ID_FIELD).await?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Remove every chunk of a material.
    pub async fn delete(&self, id: i64) -> Result<bool, PipelineError> {
        self.catalog.delete_by_field(ID_FIELD, id).await
    }

    pub fn get_mapping() -> IndexMapping {
        IndexMapping::new("2")
            .with_property("id", IndexMapping::keyword())
            .with_property(ID_FIELD, IndexMapping::integer())
            .with_property("title", IndexMapping::multilingual_text())
            .with_property("description", IndexMapping::multilingual_text())
            .with_property("filename", IndexMapping::keyword_text())
            .with_property("contents", IndexMapping::multilingual_text())
    }
}

impl SearchIndex for LearningMaterialIndexer {
    fn index_name(&self) -> &str {
        self.catalog.index_name()
    }

    fn mapping(&self) -> IndexMapping {
        Self::get_mapping()
    }
}

/// Split raw file text into pieces of at most `max_bytes` bytes.
///
/// A cut that would land inside a valid UTF-8 sequence moves back to the
/// start of that sequence. Invalid bytes are cut wherever the limit falls.
/// Empty input yields one empty piece so that a material without file text
/// is still indexed. A character wider than `max_bytes` gets a piece of its
/// own.
pub fn split_into_chunks(bytes: &[u8], max_bytes: usize) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return vec![&bytes[..0]];
    }
    let max_bytes = max_bytes.max(1);

    let mut chunks = Vec::with_capacity(bytes.len() / max_bytes + 1);
    let mut start = 0;
    while start < bytes.len() {
        let end = chunk_end(bytes, start, max_bytes);
        chunks.push(&bytes[start..end]);
        start = end;
    }
    chunks
}

fn chunk_end(bytes: &[u8], start: usize, max_bytes: usize) -> usize {
    let end = start + max_bytes;
    if end >= bytes.len() {
        return bytes.len();
    }
    // Lead byte of the sequence `end` falls into, at most three bytes back.
    let lead = (start..=end)
        .rev()
        .take(4)
        .find(|&i| !is_continuation(bytes[i]));
    match lead {
        Some(i) if i + utf8_width(bytes[i]) > end => {
            if i > start {
                i
            } else {
                (i + utf8_width(bytes[i])).min(bytes.len())
            }
        }
        _ => end,
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearchEngine;
    use async_trait::async_trait;
    use lms_search_shared::{CourseDto, IndexableCourse};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves file contents from memory and counts reads.
    #[derive(Default)]
    struct MockFiles {
        files: HashMap<String, Vec<u8>>,
        reads: AtomicUsize,
    }

    impl MockFiles {
        fn with(mut self, relative: &str, contents: &[u8]) -> Self {
            self.files
                .insert(format!("learning_material_texts/{}", relative), contents.to_vec());
            self
        }
    }

    #[async_trait]
    impl FileContentProvider for MockFiles {
        async fn get_file_contents(&self, path: &str) -> Result<Option<Vec<u8>>, PipelineError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.files.get(path).cloned())
        }
    }

    fn material(id: i64, relative_path: Option<&str>) -> IndexableEntity {
        IndexableEntity::LearningMaterial(LearningMaterialDto {
            id,
            title: format!("Material {}", id),
            description: Some("Slides".to_string()),
            filename: Some(format!("m{}.pdf", id)),
            relative_path: relative_path.map(str::to_string),
        })
    }

    fn indexer(
        engine: &Arc<MockSearchEngine>,
        files: MockFiles,
        upload_limit: usize,
    ) -> (LearningMaterialIndexer, Arc<MockFiles>) {
        let files = Arc::new(files);
        let config = SearchConfig::with_url("http://localhost:9200").upload_limit(upload_limit);
        let indexer = LearningMaterialIndexer::new(
            Some(engine.clone() as Arc<dyn SearchEngineClient>),
            files.clone(),
            &config,
        );
        (indexer, files)
    }

    fn split(bytes: &[u8], max_bytes: usize) -> Vec<String> {
        split_into_chunks(bytes, max_bytes)
            .into_iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }

    #[test]
    fn test_split_into_chunks() {
        assert_eq!(split(b"", 4), vec![""]);
        assert_eq!(split(b"abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(split(b"abcd", 4), vec!["abcd"]);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        assert_eq!(split("ééé".as_bytes(), 3), vec!["é", "é", "é"]);
        assert_eq!(split("aé".as_bytes(), 2), vec!["a", "é"]);
        assert_eq!(split("東".as_bytes(), 1), vec!["東"]);
    }

    #[test]
    fn test_split_invalid_bytes_follows_byte_length() {
        let chunks = split_into_chunks(&[0xFF; 1500], 600);

        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![600, 600, 300]);
    }

    #[test]
    fn test_split_mixed_invalid_and_multibyte() {
        let mut bytes = vec![b'a'; 5];
        bytes.push(0xFF);
        bytes.extend_from_slice("é".as_bytes());

        let chunks = split_into_chunks(&bytes, 7);

        assert_eq!(chunks, vec![&bytes[..6], &bytes[6..]]);
    }

    #[test]
    fn test_chunk_size_from_upload_limit() {
        let engine = Arc::new(MockSearchEngine::new());
        let (indexer, _) = indexer(&engine, MockFiles::default(), 1000);

        assert_eq!(indexer.max_chunk_size(), 600);
    }

    #[tokio::test]
    async fn test_index_chunks_large_file() {
        let engine = Arc::new(MockSearchEngine::new());
        let text = "a".repeat(1500);
        let files = MockFiles::default().with("x/notes.txt", text.as_bytes());
        let (indexer, _) = indexer(&engine, files, 1000);

        let ok = indexer.index(&[material(5, Some("x/notes.txt"))], false).await.unwrap();

        assert!(ok);
        assert_eq!(engine.bulk_ids(), vec!["lm_0_5", "lm_1_5", "lm_2_5"]);
        let docs = engine.bulk_documents();
        assert_eq!(docs[0]["contents"].as_str().unwrap().len(), 600);
        assert_eq!(docs[2]["contents"].as_str().unwrap().len(), 300);
        assert_eq!(docs[1]["learningMaterialId"], 5);
        assert_eq!(docs[1]["title"], "Material 5");
        assert_eq!(docs[1]["filename"], "m5.pdf");
    }

    #[tokio::test]
    async fn test_index_invalid_utf8_chunks_by_byte_length() {
        let engine = Arc::new(MockSearchEngine::new());
        let mut bytes = vec![b'a'; 700];
        bytes.extend_from_slice(&[0xFF; 500]);
        let files = MockFiles::default().with("scan.txt", &bytes);
        let (indexer, _) = indexer(&engine, files, 1000);

        indexer.index(&[material(8, Some("scan.txt"))], false).await.unwrap();

        assert_eq!(engine.bulk_ids(), vec!["lm_0_8", "lm_1_8"]);
        let docs = engine.bulk_documents();
        assert_eq!(docs[0]["contents"].as_str().unwrap().len(), 600);
        assert_eq!(docs[1]["contents"], "a".repeat(100));
    }

    #[tokio::test]
    async fn test_index_without_file_writes_one_empty_chunk() {
        let engine = Arc::new(MockSearchEngine::new());
        let files = MockFiles::default().with("empty.txt", b"");
        let (indexer, files) = indexer(&engine, files, 1000);

        indexer
            .index(&[material(1, None), material(2, Some("empty.txt"))], false)
            .await
            .unwrap();

        assert_eq!(files.reads.load(Ordering::SeqCst), 1);
        assert_eq!(engine.bulk_ids(), vec!["lm_0_1", "lm_0_2"]);
        for doc in engine.bulk_documents() {
            assert_eq!(doc["contents"], "");
        }
    }

    #[tokio::test]
    async fn test_index_cleans_contents() {
        let engine = Arc::new(MockSearchEngine::new());
        let files = MockFiles::default().with("a.txt", b"Hello, World!!  foo_bar #1");
        let (indexer, _) = indexer(&engine, files, 1000);

        indexer.index(&[material(3, Some("a.txt"))], false).await.unwrap();

        assert_eq!(engine.bulk_documents()[0]["contents"], "Hello World foobar 1");
    }

    #[tokio::test]
    async fn test_index_skips_already_indexed() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_skip(LEARNING_MATERIALS_INDEX, ID_FIELD, vec![json!(1)]);
        let files = MockFiles::default().with("1.txt", b"one").with("2.txt", b"two");
        let (indexer, files) = indexer(&engine, files, 1000);

        indexer
            .index(&[material(1, Some("1.txt")), material(2, Some("2.txt"))], false)
            .await
            .unwrap();

        assert_eq!(files.reads.load(Ordering::SeqCst), 1);
        assert_eq!(engine.bulk_ids(), vec!["lm_0_2"]);
        let searches = engine.searches.lock().unwrap();
        let filters = searches[0].body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0], json!({"terms": {"learningMaterialId": [1, 2]}}));
    }

    #[tokio::test]
    async fn test_force_bypasses_skip_query() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_skip(LEARNING_MATERIALS_INDEX, ID_FIELD, vec![json!(1)]);
        let (indexer, _) = indexer(&engine, MockFiles::default(), 1000);

        indexer.index(&[material(1, None)], true).await.unwrap();

        assert!(engine.searches.lock().unwrap().is_empty());
        assert_eq!(engine.bulk_ids(), vec!["lm_0_1"]);
    }

    #[tokio::test]
    async fn test_all_skipped_sends_no_bulk() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_skip(LEARNING_MATERIALS_INDEX, ID_FIELD, vec![json!(1)]);
        let (indexer, _) = indexer(&engine, MockFiles::default(), 1000);

        assert!(indexer.index(&[material(1, None)], false).await.unwrap());
        assert_eq!(engine.bulk_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_sends_no_bulk() {
        let engine = Arc::new(MockSearchEngine::new());
        let (indexer, _) = indexer(&engine, MockFiles::default(), 1000);

        assert!(indexer.index(&[], false).await.unwrap());
        assert_eq!(engine.bulk_count(), 0);
    }

    #[tokio::test]
    async fn test_reindexing_reuses_document_ids() {
        let engine = Arc::new(MockSearchEngine::new());
        let files = MockFiles::default().with("a.txt", b"same text");
        let (indexer, _) = indexer(&engine, files, 1000);

        indexer.index(&[material(4, Some("a.txt"))], true).await.unwrap();
        indexer.index(&[material(4, Some("a.txt"))], true).await.unwrap();

        assert_eq!(engine.bulk_ids(), vec!["lm_0_4", "lm_0_4"]);
    }

    #[tokio::test]
    async fn test_rejects_other_entities() {
        let engine = Arc::new(MockSearchEngine::new());
        let (indexer, _) = indexer(&engine, MockFiles::default(), 1000);
        let course = IndexableEntity::Course(Arc::new(IndexableCourse::new(
            CourseDto::default(),
            Vec::new(),
        )));

        let err = indexer.index(&[material(1, None), course], false).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::InvalidInput {
                expected: EntityKind::LearningMaterial,
                found: EntityKind::Course
            }
        ));
        assert!(engine.searches.lock().unwrap().is_empty());
        assert_eq!(engine.bulk_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_indexer_refuses_to_index() {
        let config = SearchConfig::default();
        let indexer = LearningMaterialIndexer::new(None, Arc::new(MockFiles::default()), &config);

        let err = indexer.index(&[material(1, None)], false).await.unwrap_err();

        assert!(matches!(err, PipelineError::SearchUnavailable));
    }

    #[tokio::test]
    async fn test_get_all_ids_deduplicates_chunks() {
        let engine = Arc::new(MockSearchEngine::new());
        engine.queue_id_pages(
            LEARNING_MATERIALS_INDEX,
            ID_FIELD,
            vec![vec![json!(3), json!(3)], vec![json!(1)]],
        );
        let (indexer, _) = indexer(&engine, MockFiles::default(), 1000);

        assert_eq!(indexer.get_all_ids().await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_delete_removes_all_chunks() {
        let engine = Arc::new(MockSearchEngine::new());
        let (indexer, _) = indexer(&engine, MockFiles::default(), 1000);

        assert!(indexer.delete(8).await.unwrap());

        let deletes = engine.deletes.lock().unwrap();
        assert_eq!(deletes[0].1, json!({"query": {"term": {"learningMaterialId": 8}}}));
    }

    #[test]
    fn test_mapping_version() {
        let body: Value = LearningMaterialIndexer::get_mapping().to_body();

        assert_eq!(body["mappings"]["_meta"]["version"], "2");
        assert_eq!(body["mappings"]["properties"]["learningMaterialId"]["type"], "integer");
    }
}
