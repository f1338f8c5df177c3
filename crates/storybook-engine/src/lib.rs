//! Story engine: turns one picture into a caption, a children's story,
//! optional translation, and spoken audio.

pub mod config;
pub mod error;
pub mod generator;
pub mod intake;
pub mod outputs;
pub mod pipeline;
pub mod providers;
pub mod speech;
pub mod translator;

#[cfg(test)]
mod fakes;

pub use config::{EngineConfig, GeminiConfig};
pub use error::{Stage, StageError};
pub use intake::{ImageBlob, IntakeError};
pub use outputs::{write_request_outputs, RequestOutputs};
pub use pipeline::{ImageSource, PipelineState, StoryPipeline, StoryReport, StoryRequest};
pub use providers::StoryServices;
pub use speech::{AudioArtifact, AudioSpool};
