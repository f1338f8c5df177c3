use std::env;
use std::time::Duration;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TRANSLATE_API_BASE: &str = "https://translate.googleapis.com";
pub const DEFAULT_TTS_API_BASE: &str = "https://translate.google.com";

const DEFAULT_TIMEOUT_S: f64 = 60.0;
const DEFAULT_MAX_IMAGE_DIM: u32 = 2048;

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub gemini: GeminiConfig,
    pub translate_api_base: String,
    pub tts_api_base: String,
    pub request_timeout: Duration,
    /// Longest side, in pixels, of the image sent to the generator.
    pub max_image_dim: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: None,
                api_base: DEFAULT_GEMINI_API_BASE.to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
            },
            translate_api_base: DEFAULT_TRANSLATE_API_BASE.to_string(),
            tts_api_base: DEFAULT_TTS_API_BASE.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_S),
            max_image_dim: DEFAULT_MAX_IMAGE_DIM,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset or blank keys
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
                api_base: get("GEMINI_API_BASE")
                    .map(|value| normalize_base(&value))
                    .unwrap_or(defaults.gemini.api_base),
                model: get("STORYBOOK_MODEL").unwrap_or(defaults.gemini.model),
            },
            translate_api_base: get("STORYBOOK_TRANSLATE_API_BASE")
                .map(|value| normalize_base(&value))
                .unwrap_or(defaults.translate_api_base),
            tts_api_base: get("STORYBOOK_TTS_API_BASE")
                .map(|value| normalize_base(&value))
                .unwrap_or(defaults.tts_api_base),
            request_timeout: Duration::from_secs_f64(parse_clamped_f64(
                get("STORYBOOK_REQUEST_TIMEOUT").as_deref(),
                DEFAULT_TIMEOUT_S,
                5.0,
                300.0,
            )),
            max_image_dim: parse_clamped_f64(
                get("STORYBOOK_MAX_IMAGE_DIM").as_deref(),
                DEFAULT_MAX_IMAGE_DIM as f64,
                256.0,
                8192.0,
            )
            .round() as u32,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.map(|value| value.trim().to_string()) {
            if !model.is_empty() {
                self.gemini.model = model;
            }
        }
        self
    }
}

fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_clamped_f64(raw: Option<&str>, default: f64, min: f64, max: f64) -> f64 {
    raw.and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{EngineConfig, DEFAULT_GEMINI_MODEL, DEFAULT_TRANSLATE_API_BASE};

    fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, EngineConfig::default());
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.translate_api_base, DEFAULT_TRANSLATE_API_BASE);
    }

    #[test]
    fn gemini_key_wins_over_google_key_and_blank_values_are_ignored() {
        let config = config_from(&[("GEMINI_API_KEY", "  "), ("GOOGLE_API_KEY", "g-key")]);
        assert_eq!(config.gemini.api_key.as_deref(), Some("g-key"));

        let config = config_from(&[("GEMINI_API_KEY", "gem"), ("GOOGLE_API_KEY", "g-key")]);
        assert_eq!(config.gemini.api_key.as_deref(), Some("gem"));
    }

    #[test]
    fn bases_lose_trailing_slashes() {
        let config = config_from(&[
            ("GEMINI_API_BASE", "http://localhost:9000/v1beta/"),
            ("STORYBOOK_TTS_API_BASE", "http://localhost:9001//"),
        ]);
        assert_eq!(config.gemini.api_base, "http://localhost:9000/v1beta");
        assert_eq!(config.tts_api_base, "http://localhost:9001");
    }

    #[test]
    fn numeric_settings_are_clamped_and_bad_values_fall_back() {
        let config = config_from(&[
            ("STORYBOOK_REQUEST_TIMEOUT", "1"),
            ("STORYBOOK_MAX_IMAGE_DIM", "not-a-number"),
        ]);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_image_dim, 2048);

        let config = config_from(&[("STORYBOOK_MAX_IMAGE_DIM", "100000")]);
        assert_eq!(config.max_image_dim, 8192);
    }

    #[test]
    fn cli_model_override_ignores_blank() {
        let config = EngineConfig::default().with_model(Some("gemini-2.5-pro".to_string()));
        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        let config = EngineConfig::default().with_model(Some(" ".to_string()));
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
    }
}
