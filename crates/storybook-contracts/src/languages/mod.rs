mod registry;
mod selectors;

pub use registry::{LanguageRegistry, TargetLanguage, SOURCE_LANGUAGE_CODE};
pub use selectors::{LanguageChoice, LanguageSelection, LanguageSelector, NO_LANGUAGE};
