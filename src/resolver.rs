//! Fallback-chain string resolution
//!
//! Candidates are tried in order; the first language holding a usable
//! translation wins. English is always the last candidate, and English text
//! supplied by the caller outranks whatever the store holds for `en`.

use crate::store::{
    ENGLISH,
    EntryStore,
    Translation,
};

/// The text chosen for a lookup and the language it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub language: String,
}

impl Resolution {
    /// Builds a resolution from owned or borrowed parts.
    fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self { text: text.into(), language: language.into() }
    }

    /// `true` when the text did not come from the store or the caller.
    #[must_use]
    pub fn is_id_fallback(&self, id: &str) -> bool {
        self.language == ENGLISH && self.text == id
    }
}

/// Builds the ordered candidate list for a lookup.
///
/// An explicit preference list replaces the UI language and fallback list.
/// Duplicates keep their first position and `en` is appended if absent.
#[must_use]
pub fn candidate_languages(
    preferred: Option<&[String]>,
    ui_language: &str,
    fallback_languages: &[String],
) -> Vec<String> {
    let ordered: Vec<&str> = match preferred {
        Some(languages) => languages.iter().map(String::as_str).collect(),
        None => std::iter::once(ui_language)
            .chain(fallback_languages.iter().map(String::as_str))
            .collect(),
    };

    let mut candidates: Vec<String> = Vec::with_capacity(ordered.len() + 1);
    for language in ordered.into_iter().chain(std::iter::once(ENGLISH)) {
        if !language.is_empty() && !candidates.iter().any(|c| c == language) {
            candidates.push(language.to_string());
        }
    }
    candidates
}

/// Non-empty, and approved when the policy asks for it.
fn usable(translation: &Translation, approved_only: bool) -> bool {
    translation.is_translated() && (!approved_only || translation.approved)
}

/// Resolves `id` against `store` following `candidates`.
#[must_use]
pub fn resolve(
    store: &EntryStore,
    id: &str,
    english: Option<&str>,
    candidates: &[String],
    approved_only: bool,
) -> Resolution {
    let entry = store.get(id);

    for language in candidates {
        if language == ENGLISH
            && let Some(english) = english
        {
            return Resolution::new(english, ENGLISH);
        }
        if let Some(translation) = entry.and_then(|e| e.translation(language))
            && usable(translation, approved_only)
        {
            return Resolution::new(translation.text.clone(), language.clone());
        }
    }

    match english {
        Some(english) => Resolution::new(english, ENGLISH),
        None => {
            tracing::debug!(id, "No translation or English text available; using the id");
            Resolution::new(id, ENGLISH)
        }
    }
}

/// Whether `language` holds a usable translation for `id`.
#[must_use]
pub fn is_available(store: &EntryStore, id: &str, language: &str, approved_only: bool) -> bool {
    store
        .get(id)
        .and_then(|entry| entry.translation(language))
        .is_some_and(|translation| usable(translation, approved_only))
}
