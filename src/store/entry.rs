//! Translation entry definitions

use std::collections::BTreeMap;

/// Source language code. English text is stored as an approved `en` translation.
pub const ENGLISH: &str = "en";

/// One language's translation of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    pub text: String,
    pub approved: bool,
}

impl Translation {
    #[must_use]
    pub fn new(text: impl Into<String>, approved: bool) -> Self {
        Self { text: text.into(), approved }
    }

    /// A translation counts as present only when its text is non-empty.
    #[must_use]
    pub const fn is_translated(&self) -> bool {
        !self.text.is_empty()
    }

    #[must_use]
    pub const fn is_approved(&self) -> bool {
        self.approved && self.is_translated()
    }
}

/// One localizable unit of an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    /// Lookup key, fixed at construction.
    id: String,
    pub english_text: String,
    pub comment: Option<String>,
    pub tooltip_text: Option<String>,
    pub shortcut_key_text: Option<String>,
    /// Language code → translation.
    pub translations: BTreeMap<String, Translation>,
    /// Registered at runtime rather than found by static harvesting.
    pub dynamic: bool,
}

impl TranslationEntry {
    /// Creates an entry whose English text is also recorded as the approved `en` translation.
    #[must_use]
    pub fn new(id: impl Into<String>, english_text: impl Into<String>) -> Self {
        let english_text = english_text.into();
        let mut translations = BTreeMap::new();
        if !english_text.is_empty() {
            translations.insert(ENGLISH.to_string(), Translation::new(english_text.clone(), true));
        }
        Self {
            id: id.into(),
            english_text,
            comment: None,
            tooltip_text: None,
            shortcut_key_text: None,
            translations,
            dynamic: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn translation(&self, language: &str) -> Option<&Translation> {
        self.translations.get(language)
    }

    /// Replaces the English text and keeps the `en` translation in step with it.
    pub fn set_english_text(&mut self, english_text: impl Into<String>) {
        self.english_text = english_text.into();
        if self.english_text.is_empty() {
            self.translations.remove(ENGLISH);
        } else {
            self.translations
                .insert(ENGLISH.to_string(), Translation::new(self.english_text.clone(), true));
        }
    }

    /// Translations other than the English source.
    pub fn foreign_translations(&self) -> impl Iterator<Item = (&String, &Translation)> {
        self.translations.iter().filter(|(lang, _)| lang.as_str() != ENGLISH)
    }
}
