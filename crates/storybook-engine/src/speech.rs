use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::error::{Stage, StageError};
use crate::providers::SpeechProvider;

/// MP3 audio for exactly one `(text, language_code)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub language_code: String,
    pub text: String,
    pub bytes: Vec<u8>,
}

impl AudioArtifact {
    pub fn file_name(&self, english: bool) -> String {
        if english {
            "english.mp3".to_string()
        } else {
            format!("{}.mp3", self.language_code)
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)
            .with_context(|| format!("failed writing audio to {}", path.display()))
    }

    /// Copies the audio into a uniquely named temporary `.mp3` that is
    /// removed when the returned spool drops.
    pub fn spool(&self) -> Result<AudioSpool> {
        let mut file = tempfile::Builder::new()
            .prefix("storybook-")
            .suffix(".mp3")
            .tempfile()
            .context("failed creating audio spool file")?;
        file.write_all(&self.bytes)
            .context("failed writing audio spool file")?;
        file.flush().context("failed flushing audio spool file")?;
        Ok(AudioSpool { file })
    }
}

#[derive(Debug)]
pub struct AudioSpool {
    file: NamedTempFile,
}

impl AudioSpool {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

pub struct Synthesizer {
    provider: Box<dyn SpeechProvider>,
}

impl Synthesizer {
    pub fn new(provider: Box<dyn SpeechProvider>) -> Self {
        Self { provider }
    }

    pub fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Option<AudioArtifact>, StageError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let bytes = self
            .provider
            .synthesize(text, language_code)
            .map_err(|err| StageError::from_anyhow(Stage::Synthesis, &err))?;
        Ok(Some(AudioArtifact {
            language_code: language_code.to_string(),
            text: text.to_string(),
            bytes,
        }))
    }
}
