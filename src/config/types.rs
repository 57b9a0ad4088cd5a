use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::document::{
    BackingKind,
    FileLayout,
    is_language_code,
};
use crate::store::ENGLISH;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "fallbackLanguages[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// One numbered line per error.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct L10nSettings {
    /// File format of every translation memory the registry reads and writes.
    pub backing_kind: BackingKind,

    /// Language the UI is shown in; first lookup candidate.
    pub ui_language: String,

    /// Tried in order after `ui_language`. English is always tried last.
    pub fallback_languages: Vec<String>,

    /// Skip translations that have not been approved.
    pub return_only_approved_strings: bool,

    pub layout: FileLayout,
}

impl L10nSettings {
    /// # Errors
    /// - Empty or malformed UI language
    /// - Empty, malformed or duplicated fallback language
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.ui_language.is_empty() {
            errors.push(ValidationError::new(
                "uiLanguage",
                "The UI language cannot be empty. Example: \"en\" or \"pt-BR\"",
            ));
        } else if !is_language_code(&self.ui_language) {
            errors.push(ValidationError::new(
                "uiLanguage",
                format!("Invalid language code '{}'", self.ui_language),
            ));
        }

        for (index, language) in self.fallback_languages.iter().enumerate() {
            let field_path = format!("fallbackLanguages[{index}]");
            if language.is_empty() {
                errors.push(ValidationError::new(
                    field_path,
                    "The language cannot be empty. Please remove this entry",
                ));
            } else if !is_language_code(language) {
                errors.push(ValidationError::new(
                    field_path,
                    format!("Invalid language code '{language}'"),
                ));
            } else if self.fallback_languages.iter().take(index).any(|earlier| earlier == language) {
                errors.push(ValidationError::new(
                    field_path,
                    format!("Duplicate language '{language}'"),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for L10nSettings {
    fn default() -> Self {
        Self {
            backing_kind: BackingKind::default(),
            ui_language: ENGLISH.to_string(),
            fallback_languages: Vec::new(),
            return_only_approved_strings: false,
            layout: FileLayout::default(),
        }
    }
}
