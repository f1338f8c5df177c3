use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use storybook_contracts::text::{pack_words, SPEECH_PIECE_CHARS};

use super::{response_bytes_or_error, SpeechProvider};

/// Client for the Google Translate speech endpoint (`translate_tts`).
///
/// The endpoint reads at most [`SPEECH_PIECE_CHARS`] characters per call, so
/// longer text is requested piece by piece and the MP3 streams are
/// concatenated.
pub struct GoogleSpeech {
    api_base: String,
    http: HttpClient,
}

impl GoogleSpeech {
    pub fn new(api_base: String, http: HttpClient) -> Self {
        Self { api_base, http }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_tts", self.api_base)
    }

    fn piece_query(
        piece: &str,
        language_code: &str,
        idx: usize,
        total: usize,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("ie", "UTF-8".to_string()),
            ("client", "tw-ob".to_string()),
            ("tl", language_code.to_string()),
            ("q", piece.to_string()),
            ("total", total.to_string()),
            ("idx", idx.to_string()),
            ("textlen", piece.chars().count().to_string()),
        ]
    }
}

impl SpeechProvider for GoogleSpeech {
    fn name(&self) -> &str {
        "google-tts"
    }

    fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>> {
        let language_code = language_code.trim();
        if !is_language_code(language_code) {
            bail!("Language not supported: '{language_code}'");
        }
        let pieces = pack_words(text, SPEECH_PIECE_CHARS);
        if pieces.is_empty() {
            bail!("No text to speak");
        }

        let total = pieces.len();
        let mut audio = Vec::new();
        for (idx, piece) in pieces.iter().enumerate() {
            let response = self
                .http
                .get(self.endpoint())
                .query(&Self::piece_query(piece, language_code, idx, total))
                .send()
                .with_context(|| {
                    format!("Google TTS request failed (piece {}/{total})", idx + 1)
                })?;
            let bytes = response_bytes_or_error("Google TTS", response)?;
            if bytes.is_empty() {
                bail!("Google TTS returned empty audio (piece {}/{total})", idx + 1);
            }
            audio.extend_from_slice(&bytes);
        }
        tracing::debug!(
            language_code,
            pieces = total,
            audio_bytes = audio.len(),
            "synthesized speech"
        );
        Ok(audio)
    }
}

/// ISO 639-1 codes, optionally with a region (`en`, `pt-BR`).
fn is_language_code(code: &str) -> bool {
    let mut parts = code.splitn(2, '-');
    let primary = parts.next().unwrap_or_default();
    let primary_ok = (2..=3).contains(&primary.len())
        && primary.chars().all(|ch| ch.is_ascii_alphabetic());
    let region_ok = parts
        .next()
        .map(|region| !region.is_empty() && region.chars().all(|ch| ch.is_ascii_alphanumeric()))
        .unwrap_or(true);
    primary_ok && region_ok
}
