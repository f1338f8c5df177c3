//! Prompt and response grammar for the caption/story request.
//!
//! The generator is asked to answer in the form
//!
//! ```text
//! Caption: <one sentence>
//!
//! Story: <story text>
//! ```
//!
//! and [`parse_generation_response`] splits that answer back into its two
//! labeled fields. Answers that do not follow the form are reported as
//! [`ParsedResponse::Unlabeled`] rather than as an error.

pub const CAPTION_MARKER: &str = "Caption:";
pub const STORY_MARKER: &str = "Story:";
pub const FALLBACK_CAPTION: &str = "Image description";
pub const UNLABELED_RESPONSE_WARNING: &str =
    "Error parsing the response. Using full response as story.";

pub const STORY_PROMPT: &str = "\
1. First, describe what you see in this image in one sentence.
2. Then, create an engaging children's story (200-300 words) based on what you see.
Make the story suitable for ages 5-12, using simple language and a clear narrative.

Format your response as:
Caption: [your one-sentence description]

Story: [your story]
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Labeled { caption: String, story: String },
    Unlabeled { raw: String },
}

/// Caption and story for one image, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub caption: Option<String>,
    pub story: Option<String>,
    /// False when the response did not follow the labeled grammar and the
    /// fallback caption was used.
    pub labeled: bool,
}

impl GenerationResult {
    pub fn absent() -> Self {
        Self {
            caption: None,
            story: None,
            labeled: false,
        }
    }
}

impl From<ParsedResponse> for GenerationResult {
    fn from(parsed: ParsedResponse) -> Self {
        match parsed {
            ParsedResponse::Labeled { caption, story } => Self {
                caption: non_empty(caption),
                story: non_empty(story),
                labeled: true,
            },
            ParsedResponse::Unlabeled { raw } => Self {
                caption: Some(FALLBACK_CAPTION.to_string()),
                story: non_empty(raw),
                labeled: false,
            },
        }
    }
}

/// Caption is the text between the first `Caption:` and the first `Story:`
/// after it; story is everything after that `Story:`.
///
/// Only `*` runs touching a label are dropped (the bold in `**Caption:**`
/// and `**Story:**`); emphasis inside either field is kept.
pub fn parse_generation_response(text: &str) -> ParsedResponse {
    let Some(caption_start) = text
        .find(CAPTION_MARKER)
        .map(|offset| offset + CAPTION_MARKER.len())
    else {
        return unlabeled(text);
    };
    let Some(story_marker) = text[caption_start..].find(STORY_MARKER) else {
        return unlabeled(text);
    };
    let caption_end = caption_start + story_marker;
    let story_start = caption_end + STORY_MARKER.len();

    ParsedResponse::Labeled {
        caption: text[caption_start..caption_end]
            .trim_start_matches('*')
            .trim_end_matches('*')
            .trim()
            .to_string(),
        story: text[story_start..]
            .trim_start_matches('*')
            .trim()
            .to_string(),
    }
}

fn unlabeled(text: &str) -> ParsedResponse {
    ParsedResponse::Unlabeled {
        raw: text.to_string(),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
