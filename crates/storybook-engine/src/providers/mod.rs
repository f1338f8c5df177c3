//! Service seams of the pipeline and their implementations.
//!
//! Each external service sits behind a small blocking trait. `google`
//! clients talk to the hosted services over HTTP; `dryrun` clients answer
//! locally and are used for offline runs.

mod dryrun;
mod gemini;
mod google_translate;
mod google_tts;
#[cfg(test)]
pub(crate) mod test_server;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::truncate_text;
use crate::intake::EncodedImage;

pub use dryrun::{DryrunCaptioner, DryrunSpeech, DryrunTranslator, SILENT_MP3_FRAME};
pub use gemini::GeminiCaptioner;
pub use google_translate::GoogleTranslator;
pub use google_tts::GoogleSpeech;

/// Sends one prompt plus one image and returns the model's raw text.
pub trait CaptionProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str, image: &EncodedImage) -> Result<String>;
}

/// Translates one chunk of text, already within the service's size limit.
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn translate(&self, text: &str, source_code: &str, target_code: &str) -> Result<String>;
}

/// Turns text into MP3 bytes.
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &str;
    fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>>;
}

pub struct StoryServices {
    pub captioner: Box<dyn CaptionProvider>,
    pub translator: Box<dyn TranslationProvider>,
    pub speech: Box<dyn SpeechProvider>,
}

impl StoryServices {
    pub fn google(config: &EngineConfig) -> Result<Self> {
        let http = build_http_client(config.request_timeout)?;
        Ok(Self {
            captioner: Box::new(GeminiCaptioner::new(config.gemini.clone(), http.clone())),
            translator: Box::new(GoogleTranslator::new(
                config.translate_api_base.clone(),
                http.clone(),
            )),
            speech: Box::new(GoogleSpeech::new(config.tts_api_base.clone(), http)),
        })
    }

    pub fn dryrun() -> Self {
        Self {
            captioner: Box::new(DryrunCaptioner),
            translator: Box::new(DryrunTranslator),
            speech: Box::new(DryrunSpeech),
        }
    }

    /// Backend label for logs and summaries, e.g. `gemini+google-translate+google-tts`.
    pub fn describe(&self) -> String {
        format!(
            "{}+{}+{}",
            self.captioner.name(),
            self.translator.name(),
            self.speech.name()
        )
    }
}

fn build_http_client(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .user_agent(concat!("storybook/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn response_bytes_or_error(provider: &str, response: HttpResponse) -> Result<Vec<u8>> {
    let status = response.status();
    let code = status.as_u16();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let bytes = response
        .bytes()
        .with_context(|| format!("{provider} response body read failed"))?;
    Ok(bytes.to_vec())
}
