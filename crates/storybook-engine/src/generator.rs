use storybook_contracts::story::{
    parse_generation_response, GenerationResult, STORY_PROMPT,
};

use crate::error::{Stage, StageError};
use crate::intake::{DecodedImage, EncodedImage, ImageBlob};
use crate::providers::CaptionProvider;

/// Caption/story stage: one prompt, one image, one request.
pub struct StoryGenerator {
    provider: Box<dyn CaptionProvider>,
    prompt: String,
    max_image_dim: u32,
}

impl StoryGenerator {
    pub fn new(provider: Box<dyn CaptionProvider>, max_image_dim: u32) -> Self {
        Self {
            provider,
            prompt: STORY_PROMPT.to_string(),
            max_image_dim,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn encode(&self, image: &DecodedImage) -> Result<EncodedImage, StageError> {
        image
            .encode_for_transport(self.max_image_dim)
            .map_err(|err| StageError::Generation(err.to_string()))
    }

    /// Decodes `blob` and generates from it. Undecodable input is an
    /// intake failure, not a generation failure.
    pub fn generate_from_blob(&self, blob: &ImageBlob) -> Result<GenerationResult, StageError> {
        let decoded = blob
            .decode()
            .map_err(|err| StageError::Intake(err.to_string()))?;
        self.generate(&decoded)
    }

    /// A service failure is an error; a response that does not follow the
    /// `Caption:`/`Story:` grammar is not, and yields the fallback caption.
    pub fn generate(&self, image: &DecodedImage) -> Result<GenerationResult, StageError> {
        let encoded = self.encode(image)?;
        let text = self
            .provider
            .generate(&self.prompt, &encoded)
            .map_err(|err| StageError::from_anyhow(Stage::Generation, &err))?;
        Ok(GenerationResult::from(parse_generation_response(&text)))
    }
}
