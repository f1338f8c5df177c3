//! Per-request orchestration.
//!
//! A request walks a fixed, linear path:
//!
//! ```text
//! Idle -> ImageDecoded -> Storied -> EnglishAudioReady
//!      -> (TranslationReady -> TranslatedAudioReady) -> Done
//! ```
//!
//! Every stage failure is caught, recorded on the [`StoryReport`] and turned
//! into an absent value; later stages that need that value are skipped.
//! [`StoryPipeline::run`] never returns an error.

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use storybook_contracts::events::{EventPayload, EventWriter};
use storybook_contracts::languages::{LanguageRegistry, LanguageSelector, TargetLanguage};
use storybook_contracts::runs::summary::{AudioSummary, ImageSummary, RequestSummary};
use storybook_contracts::story::{GenerationResult, UNLABELED_RESPONSE_WARNING};

use crate::config::EngineConfig;
use crate::error::StageError;
use crate::generator::StoryGenerator;
use crate::intake::{DecodedImage, ImageBlob};
use crate::providers::StoryServices;
use crate::speech::{AudioArtifact, Synthesizer};
use crate::translator::Translator;

pub const ENGLISH_CODE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    ImageDecoded,
    Storied,
    EnglishAudioReady,
    TranslationReady,
    TranslatedAudioReady,
    Done,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ImageDecoded => "image_decoded",
            Self::Storied => "storied",
            Self::EnglishAudioReady => "english_audio_ready",
            Self::TranslationReady => "translation_ready",
            Self::TranslatedAudioReady => "translated_audio_ready",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRequest {
    pub image: ImageSource,
    /// Display name of the target language; `None` or `"none"` skips
    /// translation.
    pub language: Option<String>,
}

impl StoryRequest {
    pub fn from_path(path: impl Into<PathBuf>, language: Option<String>) -> Self {
        Self {
            image: ImageSource::Path(path.into()),
            language,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, language: Option<String>) -> Self {
        Self {
            image: ImageSource::Bytes(bytes),
            language,
        }
    }
}

/// Everything one request produced, including what went wrong.
#[derive(Debug, Clone)]
pub struct StoryReport {
    pub request_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub image: Option<ImageSummary>,
    pub generation: GenerationResult,
    pub language: Option<TargetLanguage>,
    pub translated_story: Option<String>,
    pub english_audio: Option<AudioArtifact>,
    pub translated_audio: Option<AudioArtifact>,
    pub errors: Vec<StageError>,
    pub warnings: Vec<String>,
    pub states: Vec<PipelineState>,
}

impl StoryReport {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            started_at: now_utc_iso(),
            finished_at: String::new(),
            image: None,
            generation: GenerationResult::absent(),
            language: None,
            translated_story: None,
            english_audio: None,
            translated_audio: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            states: vec![PipelineState::Idle],
        }
    }

    pub fn caption(&self) -> Option<&str> {
        self.generation.caption.as_deref()
    }

    pub fn story(&self) -> Option<&str> {
        self.generation.story.as_deref()
    }

    pub fn has_story(&self) -> bool {
        self.story().is_some()
    }

    pub fn reached(&self, state: PipelineState) -> bool {
        self.states.contains(&state)
    }

    pub fn audio(&self) -> impl Iterator<Item = &AudioArtifact> {
        self.english_audio.iter().chain(self.translated_audio.iter())
    }

    /// `audio` lists the files the caller wrote for this report, if any.
    pub fn summary(&self, audio: Vec<AudioSummary>) -> RequestSummary {
        RequestSummary {
            request_id: self.request_id.clone(),
            started_at: self.started_at.clone(),
            finished_at: self.finished_at.clone(),
            image: self.image.clone(),
            caption: self.generation.caption.clone(),
            story: self.generation.story.clone(),
            labeled: self.generation.labeled,
            language: self
                .language
                .as_ref()
                .map(|language| language.display_name.clone()),
            language_code: self.language.as_ref().map(|language| language.code.clone()),
            translated_story: self.translated_story.clone(),
            audio,
            warnings: self.warnings.clone(),
            errors: self.errors.iter().map(ToString::to_string).collect(),
        }
    }

    fn enter(&mut self, state: PipelineState) {
        self.states.push(state);
    }
}

pub struct StoryPipeline {
    generator: StoryGenerator,
    translator: Translator,
    synthesizer: Synthesizer,
    selector: LanguageSelector,
    events: EventWriter,
    backend: String,
}

impl StoryPipeline {
    pub fn new(services: StoryServices, config: &EngineConfig, events: EventWriter) -> Self {
        let backend = services.describe();
        let StoryServices {
            captioner,
            translator,
            speech,
        } = services;
        Self {
            generator: StoryGenerator::new(captioner, config.max_image_dim),
            translator: Translator::new(translator),
            synthesizer: Synthesizer::new(speech),
            selector: LanguageSelector::default(),
            events,
            backend,
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.selector.registry
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn run(&self, request: &StoryRequest) -> StoryReport {
        let mut report = StoryReport::new(uuid::Uuid::new_v4().to_string());
        let span = tracing::info_span!("story_request", request_id = %report.request_id);
        let _guard = span.enter();

        let source = match &request.image {
            ImageSource::Path(path) => Value::String(path.display().to_string()),
            ImageSource::Bytes(bytes) => json!({"bytes": bytes.len()}),
        };
        self.emit(
            &report,
            "request_started",
            json!({
                "backend": self.backend,
                "language": request.language,
                "source": source,
            }),
        );

        match self.intake(request, &mut report) {
            Ok(decoded) => self.run_stages(request, &decoded, &mut report),
            Err(err) => self.record_failure(&mut report, err),
        }

        report.finished_at = now_utc_iso();
        report.enter(PipelineState::Done);
        self.emit(
            &report,
            "request_finished",
            json!({
                "has_story": report.has_story(),
                "states": report.states.iter().map(PipelineState::as_str).collect::<Vec<_>>(),
                "errors": report.errors.len(),
                "warnings": report.warnings.len(),
            }),
        );
        tracing::info!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "request finished"
        );
        report
    }

    fn intake(
        &self,
        request: &StoryRequest,
        report: &mut StoryReport,
    ) -> Result<DecodedImage, StageError> {
        let blob = match &request.image {
            ImageSource::Path(path) => ImageBlob::from_path(path),
            ImageSource::Bytes(bytes) => ImageBlob::from_bytes(bytes.clone()),
        }
        .map_err(|err| StageError::Intake(err.to_string()))?;
        let decoded = blob
            .decode()
            .map_err(|err| StageError::Intake(err.to_string()))?;

        let (width, height) = decoded.dimensions();
        report.image = Some(ImageSummary {
            format: blob.format().as_str().to_string(),
            width,
            height,
            sha256: blob.sha256_hex(),
        });
        report.enter(PipelineState::ImageDecoded);
        self.emit(
            report,
            "image_decoded",
            json!({
                "format": blob.format().as_str(),
                "width": width,
                "height": height,
                "sha256": blob.sha256_hex(),
            }),
        );
        Ok(decoded)
    }

    fn run_stages(&self, request: &StoryRequest, decoded: &DecodedImage, report: &mut StoryReport) {
        match self.generator.generate(decoded) {
            Ok(generation) => {
                if !generation.labeled {
                    report.warnings.push(UNLABELED_RESPONSE_WARNING.to_string());
                    self.emit(
                        report,
                        "response_unparsed",
                        json!({"warning": UNLABELED_RESPONSE_WARNING}),
                    );
                }
                report.generation = generation;
                report.enter(PipelineState::Storied);
                self.emit(
                    report,
                    "story_generated",
                    json!({
                        "provider": self.generator.provider_name(),
                        "labeled": report.generation.labeled,
                        "caption": report.generation.caption,
                        "story_chars": report.story().map(|story| story.chars().count()),
                    }),
                );
            }
            Err(err) => {
                self.record_failure(report, err);
                return;
            }
        }

        let Some(story) = report.generation.story.clone() else {
            return;
        };

        if let Some(audio) = self.speak(report, &story, ENGLISH_CODE) {
            report.english_audio = Some(audio);
            report.enter(PipelineState::EnglishAudioReady);
        }

        let choice = self.selector.select(request.language.as_deref());
        if let Some(reason) = choice.skip_reason {
            tracing::warn!(requested = ?choice.requested, "unsupported language skipped");
            self.emit(
                report,
                "language_skipped",
                json!({"requested": choice.requested, "reason": reason}),
            );
            report.warnings.push(reason);
            return;
        }
        let Some(target) = choice.selection.target().cloned() else {
            return;
        };
        report.language = Some(target.clone());

        let translated = match self.translator.translate(&story, &target.code) {
            Ok(Some(text)) => text,
            Ok(None) => return,
            Err(err) => {
                self.record_failure(report, err);
                return;
            }
        };
        report.translated_story = Some(translated.clone());
        report.enter(PipelineState::TranslationReady);
        self.emit(
            report,
            "translation_ready",
            json!({
                "language": target.display_name,
                "language_code": target.code,
                "chars": translated.chars().count(),
            }),
        );

        if let Some(audio) = self.speak(report, &translated, &target.code) {
            report.translated_audio = Some(audio);
            report.enter(PipelineState::TranslatedAudioReady);
        }
    }

    fn speak(&self, report: &mut StoryReport, text: &str, code: &str) -> Option<AudioArtifact> {
        match self.synthesizer.synthesize(text, code) {
            Ok(Some(audio)) => {
                self.emit(
                    report,
                    "audio_ready",
                    json!({"language_code": code, "bytes": audio.bytes.len()}),
                );
                Some(audio)
            }
            Ok(None) => None,
            Err(err) => {
                self.record_failure(report, err);
                None
            }
        }
    }

    fn record_failure(&self, report: &mut StoryReport, err: StageError) {
        tracing::warn!(stage = err.stage().as_str(), error = %err, "stage failed");
        self.emit(
            report,
            "stage_failed",
            json!({"stage": err.stage().as_str(), "error": err.to_string()}),
        );
        report.errors.push(err);
    }

    /// Event log failures are logged and never fail the request.
    fn emit(&self, report: &StoryReport, event_type: &str, payload: Value) {
        let mut payload: EventPayload = map_object(payload);
        payload.insert(
            "request_id".to_string(),
            Value::String(report.request_id.clone()),
        );
        if let Err(err) = self.events.emit(event_type, payload) {
            tracing::warn!(event_type, error = %err, "failed to record event");
        }
    }
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
