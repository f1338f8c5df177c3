use storybook_contracts::languages::SOURCE_LANGUAGE_CODE;
use storybook_contracts::text::{chunk_text, join_chunks, TRANSLATION_CHUNK_CHARS};

use crate::error::{Stage, StageError};
use crate::providers::TranslationProvider;

/// Translation stage: fixed-size chunks, translated independently and
/// joined with single spaces. Any failing chunk fails the whole call.
pub struct Translator {
    provider: Box<dyn TranslationProvider>,
    max_chunk_chars: usize,
}

impl Translator {
    pub fn new(provider: Box<dyn TranslationProvider>) -> Self {
        Self::with_chunk_limit(provider, TRANSLATION_CHUNK_CHARS)
    }

    pub fn with_chunk_limit(provider: Box<dyn TranslationProvider>, max_chunk_chars: usize) -> Self {
        Self {
            provider,
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }

    pub fn translate(&self, text: &str, target_code: &str) -> Result<Option<String>, StageError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let chunks = chunk_text(text, self.max_chunk_chars);
        let translated = chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| {
                self.provider
                    .translate(chunk, SOURCE_LANGUAGE_CODE, target_code)
                    .map_err(|err| {
                        tracing::warn!(
                            chunk = idx + 1,
                            chunks = chunks.len(),
                            target_code,
                            "translation chunk failed"
                        );
                        StageError::from_anyhow(Stage::Translation, &err)
                    })
            })
            .collect::<Result<Vec<String>, StageError>>()?;
        Ok(Some(join_chunks(&translated)))
    }
}
