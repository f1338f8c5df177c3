use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;

use super::{response_json_or_error, TranslationProvider};

/// Client for the public Google Translate web endpoint (`translate_a/single`).
pub struct GoogleTranslator {
    api_base: String,
    http: HttpClient,
}

impl GoogleTranslator {
    pub fn new(api_base: String, http: HttpClient) -> Self {
        Self { api_base, http }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_a/single", self.api_base)
    }

    /// The response is a nested array; element `[0]` lists sentence pairs
    /// whose first entry is the translated sentence.
    fn extract_translation(payload: &Value) -> Option<String> {
        let sentences = payload.get(0).and_then(Value::as_array)?;
        let text: String = sentences
            .iter()
            .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl TranslationProvider for GoogleTranslator {
    fn name(&self) -> &str {
        "google-translate"
    }

    fn translate(&self, text: &str, source_code: &str, target_code: &str) -> Result<String> {
        let response = self
            .http
            .get(self.endpoint())
            .query(&[
                ("client", "gtx"),
                ("sl", source_code),
                ("tl", target_code),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .with_context(|| format!("Google Translate request failed ({source_code}->{target_code})"))?;
        let parsed = response_json_or_error("Google Translate", response)?;
        let Some(translated) = Self::extract_translation(&parsed) else {
            bail!("Google Translate returned no translation for '{target_code}'");
        };
        Ok(translated)
    }
}
