//! Language preferences shared by every manager

use parking_lot::RwLock;

use crate::config::L10nSettings;
use crate::resolver::candidate_languages;

/// Copy of the shared language preferences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePreferences {
    /// UI language, the first candidate
    pub ui_language: String,
    /// Tried after the UI language
    pub fallback_languages: Vec<String>,
    /// Return approved translations only
    pub return_only_approved: bool,
}

impl LanguagePreferences {
    /// Lookup candidates, English last
    ///
    /// `preferred` replaces the UI language and fallback list when given.
    #[must_use]
    pub fn candidates(&self, preferred: Option<&[String]>) -> Vec<String> {
        candidate_languages(preferred, &self.ui_language, &self.fallback_languages)
    }
}

impl From<&L10nSettings> for LanguagePreferences {
    fn from(settings: &L10nSettings) -> Self {
        Self {
            ui_language: settings.ui_language.clone(),
            fallback_languages: settings.fallback_languages.clone(),
            return_only_approved: settings.return_only_approved_strings,
        }
    }
}

/// Shared language preferences
///
/// # Lock order
///
/// Registry map, then a manager's store, then this state. Readers copy a
/// [`LanguageState::snapshot`] and never take another lock while holding
/// this one.
#[derive(Debug)]
pub(crate) struct LanguageState {
    /// Current preferences
    preferences: RwLock<LanguagePreferences>,
}

impl LanguageState {
    /// Starts from `preferences`
    pub(crate) fn new(preferences: LanguagePreferences) -> Self {
        Self { preferences: RwLock::new(preferences) }
    }

    /// Copy of the current preferences
    pub(crate) fn snapshot(&self) -> LanguagePreferences {
        self.preferences.read().clone()
    }

    /// Modifies the preferences in place
    pub(crate) fn update(&self, change: impl FnOnce(&mut LanguagePreferences)) {
        change(&mut self.preferences.write());
    }
}
