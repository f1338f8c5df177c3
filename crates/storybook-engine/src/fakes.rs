//! Scripted service doubles for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::intake::EncodedImage;
use crate::providers::{CaptionProvider, SpeechProvider, StoryServices, TranslationProvider};

#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<AtomicUsize>,
    inputs: Arc<Mutex<Vec<(String, String)>>>,
}

impl CallLog {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(text, language)` pairs in call order.
    pub fn inputs(&self) -> Vec<(String, String)> {
        self.inputs.lock().map(|inputs| inputs.clone()).unwrap_or_default()
    }

    fn record(&self, text: &str, language: &str) -> usize {
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push((text.to_string(), language.to_string()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct FakeCaptioner {
    pub response: Result<String, String>,
    pub log: CallLog,
}

impl FakeCaptioner {
    pub fn replying(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            log: CallLog::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            log: CallLog::default(),
        }
    }
}

impl CaptionProvider for FakeCaptioner {
    fn name(&self) -> &str {
        "fake-caption"
    }

    fn generate(&self, prompt: &str, image: &EncodedImage) -> Result<String> {
        self.log.record(prompt, image.mime_type);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => bail!("{message}"),
        }
    }
}

/// Echoes its input; fails on the call numbered `fail_on_call` (1-based).
#[derive(Default)]
pub struct EchoTranslator {
    pub fail_on_call: Option<usize>,
    pub log: CallLog,
}

impl TranslationProvider for EchoTranslator {
    fn name(&self) -> &str {
        "echo-translate"
    }

    fn translate(&self, text: &str, _source_code: &str, target_code: &str) -> Result<String> {
        let call = self.log.record(text, target_code);
        if self.fail_on_call == Some(call) {
            bail!("translation quota exceeded");
        }
        Ok(text.to_string())
    }
}

/// Returns the UTF-8 bytes of its input; fails for the listed languages.
#[derive(Default)]
pub struct EchoSpeech {
    pub failing_languages: Vec<String>,
    pub log: CallLog,
}

impl SpeechProvider for EchoSpeech {
    fn name(&self) -> &str {
        "echo-speech"
    }

    fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>> {
        self.log.record(text, language_code);
        if self.failing_languages.iter().any(|code| code == language_code) {
            bail!("Language not supported: '{language_code}'");
        }
        Ok(text.as_bytes().to_vec())
    }
}

pub struct FakeServices {
    pub caption_log: CallLog,
    pub translate_log: CallLog,
    pub speech_log: CallLog,
}

impl FakeServices {
    pub fn build(
        captioner: FakeCaptioner,
        translator: EchoTranslator,
        speech: EchoSpeech,
    ) -> (StoryServices, FakeServices) {
        let logs = FakeServices {
            caption_log: captioner.log.clone(),
            translate_log: translator.log.clone(),
            speech_log: speech.log.clone(),
        };
        let services = StoryServices {
            captioner: Box::new(captioner),
            translator: Box::new(translator),
            speech: Box::new(speech),
        };
        (services, logs)
    }
}
