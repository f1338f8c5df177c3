use super::registry::{LanguageRegistry, TargetLanguage};

/// Menu entry meaning "do not translate".
pub const NO_LANGUAGE: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageSelection {
    None,
    Translate(TargetLanguage),
}

impl LanguageSelection {
    pub fn target(&self) -> Option<&TargetLanguage> {
        match self {
            Self::None => None,
            Self::Translate(language) => Some(language),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChoice {
    pub selection: LanguageSelection,
    pub requested: Option<String>,
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageSelector {
    pub registry: LanguageRegistry,
}

impl LanguageSelector {
    pub fn new(registry: Option<LanguageRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    pub fn select(&self, requested: Option<&str>) -> LanguageChoice {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        let Some(requested_value) = requested else {
            return LanguageChoice {
                selection: LanguageSelection::None,
                requested: None,
                skip_reason: None,
            };
        };
        if requested_value.eq_ignore_ascii_case(NO_LANGUAGE) {
            return LanguageChoice {
                selection: LanguageSelection::None,
                requested: Some(requested_value.to_string()),
                skip_reason: None,
            };
        }

        if let Some(language) = self.registry.get(requested_value) {
            return LanguageChoice {
                selection: LanguageSelection::Translate(language.clone()),
                requested: Some(requested_value.to_string()),
                skip_reason: None,
            };
        }

        LanguageChoice {
            selection: LanguageSelection::None,
            requested: Some(requested_value.to_string()),
            skip_reason: Some(format!(
                "Language '{requested_value}' is not supported; choose one of: {}.",
                self.registry.display_names().join(", ")
            )),
        }
    }
}
