//! Text cleanup applied to file contents before indexing.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::PipelineError;

lazy_static! {
    static ref PUNCTUATION: Result<Regex, regex::Error> = Regex::new(r"\p{P}");
    static ref NON_WORD: Result<Regex, regex::Error> = Regex::new(r"[^\p{L}\p{N}\s]");
    static ref WHITESPACE_RUNS: Result<Regex, regex::Error> = Regex::new(r"\s+");
}

/// Strips punctuation and symbols and collapses whitespace.
///
/// The steps run in a fixed order: Unicode punctuation is removed, then every
/// character that is not a letter, number or whitespace, then runs of
/// whitespace collapse to one space and the result is trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSanitizer;

impl TextSanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Clean `text` belonging to `entity_id`.
    ///
    /// A pattern failure is reported against the entity, never swallowed.
    pub fn clean(&self, entity_id: impl ToString, text: &str) -> Result<String, PipelineError> {
        let entity_id = entity_id.to_string();

        let text = compiled(&PUNCTUATION, &entity_id)?.replace_all(text, "");
        let text = compiled(&NON_WORD, &entity_id)?.replace_all(&text, "");
        let text = compiled(&WHITESPACE_RUNS, &entity_id)?.replace_all(&text, " ");

        Ok(text.trim().to_string())
    }
}

fn compiled<'a>(
    pattern: &'a Result<Regex, regex::Error>,
    entity_id: &str,
) -> Result<&'a Regex, PipelineError> {
    pattern
        .as_ref()
        .map_err(|e| PipelineError::text_normalization(entity_id, e.to_string()))
}
