use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use super::{response_json_or_error, CaptionProvider};
use crate::config::GeminiConfig;
use crate::intake::EncodedImage;

/// Request URLs never carry the key.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiCaptioner {
    config: GeminiConfig,
    http: HttpClient,
}

impl GeminiCaptioner {
    pub fn new(config: GeminiConfig, http: HttpClient) -> Self {
        Self { config, http }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }

    fn build_payload(prompt: &str, image: &EncodedImage) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": BASE64.encode(&image.bytes),
                        }
                    },
                ],
            }],
        })
    }

    /// Joins the text parts of the first candidate.
    fn extract_text(response_payload: &Value) -> Option<String> {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)?;
        let text = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<&str>>()
            .join("");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn blocked_reason(response_payload: &Value) -> Option<String> {
        if let Some(reason) = response_payload
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str)
        {
            return Some(reason.to_string());
        }
        response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("finishReason"))
            .and_then(Value::as_str)
            .filter(|reason| *reason != "STOP")
            .map(str::to_string)
    }
}

impl CaptionProvider for GeminiCaptioner {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, prompt: &str, image: &EncodedImage) -> Result<String> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = self.endpoint_for_model(&self.config.model);
        let payload = Self::build_payload(prompt, image);
        tracing::debug!(
            model = %self.config.model,
            image_bytes = image.bytes.len(),
            width = image.width,
            height = image.height,
            "sending caption request"
        );

        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({})", self.config.model))?;
        let parsed = response_json_or_error("Gemini", response)?;

        match Self::extract_text(&parsed) {
            Some(text) => Ok(text),
            None => match Self::blocked_reason(&parsed) {
                Some(reason) => bail!("Gemini returned no text (reason: {reason})"),
                None => bail!("Gemini returned no text"),
            },
        }
    }
}
