use indexmap::IndexMap;

/// Every story is generated in English and translated from it.
pub const SOURCE_LANGUAGE_CODE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLanguage {
    /// Lower-case lookup key, e.g. `telugu`.
    pub key: String,
    /// Name shown to the user, e.g. `Telugu`.
    pub display_name: String,
    /// ISO 639-1 code understood by the translation and speech services.
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: IndexMap<String, TargetLanguage>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LanguageRegistry {
    pub fn new(languages: Option<IndexMap<String, TargetLanguage>>) -> Self {
        Self {
            languages: languages.unwrap_or_else(default_languages),
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn get(&self, name: &str) -> Option<&TargetLanguage> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.languages.get(&key)
    }

    pub fn list(&self) -> impl Iterator<Item = &TargetLanguage> {
        self.languages.values()
    }

    pub fn display_names(&self) -> Vec<String> {
        self.languages
            .values()
            .map(|language| language.display_name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

fn default_languages() -> IndexMap<String, TargetLanguage> {
    let mut map = IndexMap::new();

    let mut insert = |display_name: &str, code: &str| {
        let key = display_name.to_lowercase();
        map.insert(
            key.clone(),
            TargetLanguage {
                key,
                display_name: display_name.to_string(),
                code: code.to_string(),
            },
        );
    };

    insert("Telugu", "te");
    insert("Hindi", "hi");
    insert("Tamil", "ta");
    insert("Kannada", "kn");
    insert("Malayalam", "ml");

    map
}
