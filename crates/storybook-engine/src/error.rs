use thiserror::Error;

const ERROR_MESSAGE_MAX_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intake,
    Generation,
    Translation,
    Synthesis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Generation => "generation",
            Self::Translation => "translation",
            Self::Synthesis => "synthesis",
        }
    }
}

/// A user-visible failure of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("Error processing image: {0}")]
    Intake(String),
    #[error("Error generating content: {0}")]
    Generation(String),
    #[error("Error translating text: {0}")]
    Translation(String),
    #[error("Error generating speech: {0}")]
    Synthesis(String),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Intake(_) => Stage::Intake,
            Self::Generation(_) => Stage::Generation,
            Self::Translation(_) => Stage::Translation,
            Self::Synthesis(_) => Stage::Synthesis,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Intake(detail)
            | Self::Generation(detail)
            | Self::Translation(detail)
            | Self::Synthesis(detail) => detail,
        }
    }

    pub(crate) fn from_anyhow(stage: Stage, err: &anyhow::Error) -> Self {
        let detail = error_chain_text(err, ERROR_MESSAGE_MAX_CHARS);
        match stage {
            Stage::Intake => Self::Intake(detail),
            Stage::Generation => Self::Generation(detail),
            Stage::Translation => Self::Translation(detail),
            Stage::Synthesis => Self::Synthesis(detail),
        }
    }
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::{error_chain_text, truncate_text, Stage, StageError};

    #[test]
    fn stage_error_messages_name_the_failed_step() {
        let err = StageError::Translation("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Error translating text: quota exceeded");
        assert_eq!(err.stage(), Stage::Translation);
        assert_eq!(err.detail(), "quota exceeded");
    }

    #[test]
    fn anyhow_chain_is_flattened_without_repeats() {
        let root: anyhow::Result<()> = Err(anyhow::anyhow!("connection refused"));
        let err = root
            .context("Gemini request failed")
            .context("Gemini request failed")
            .err()
            .unwrap_or_else(|| anyhow::anyhow!("unreachable"));
        assert_eq!(
            error_chain_text(&err, 512),
            "Gemini request failed | caused by: connection refused"
        );

        let stage = StageError::from_anyhow(Stage::Generation, &err);
        assert_eq!(
            stage.to_string(),
            "Error generating content: Gemini request failed | caused by: connection refused"
        );
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
