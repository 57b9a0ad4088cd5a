//! In-memory store of one application's localizable strings

use std::collections::{
    BTreeSet,
    HashMap,
};

use super::entry::{
    ENGLISH,
    Translation,
    TranslationEntry,
};

/// A string discovered by a harvester, before any translation exists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestedString {
    pub id: String,
    pub english_text: String,
    pub comment: Option<String>,
    pub tooltip_text: Option<String>,
    pub shortcut_key_text: Option<String>,
}

impl HarvestedString {
    #[must_use]
    pub fn new(id: impl Into<String>, english_text: impl Into<String>) -> Self {
        Self { id: id.into(), english_text: english_text.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Identifier → entry map, format agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryStore {
    /// Keyed by entry id
    entries: HashMap<String, TranslationEntry>,
}

impl EntryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TranslationEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Inserts or replaces a whole entry.
    pub fn insert(&mut self, entry: TranslationEntry) {
        self.entries.insert(entry.id().to_string(), entry);
    }

    pub fn remove(&mut self, id: &str) -> Option<TranslationEntry> {
        self.entries.remove(id)
    }

    /// Sets one language's translation, creating a dynamic entry for an unknown id.
    ///
    /// Returns `true` when the id was not known before.
    pub fn upsert_translation(
        &mut self,
        id: &str,
        language: &str,
        text: &str,
        approved: bool,
        english_text: Option<&str>,
        comment: Option<&str>,
    ) -> bool {
        let created = !self.entries.contains_key(id);
        let entry = self.entries.entry(id.to_string()).or_insert_with(|| {
            let mut entry = TranslationEntry::new(id, english_text.unwrap_or_default());
            entry.comment = comment.map(ToString::to_string);
            entry.dynamic = true;
            entry
        });

        if language == ENGLISH && text != entry.english_text {
            entry.set_english_text(text);
        }
        entry.translations.insert(language.to_string(), Translation::new(text, approved));
        created
    }

    /// Records harvested baseline metadata without touching existing translations.
    pub fn harvest(&mut self, harvested: HarvestedString) {
        match self.entries.get_mut(&harvested.id) {
            Some(entry) => {
                entry.set_english_text(harvested.english_text);
                if harvested.comment.is_some() {
                    entry.comment = harvested.comment;
                }
                if harvested.tooltip_text.is_some() {
                    entry.tooltip_text = harvested.tooltip_text;
                }
                if harvested.shortcut_key_text.is_some() {
                    entry.shortcut_key_text = harvested.shortcut_key_text;
                }
                entry.dynamic = false;
            }
            None => {
                let mut entry = TranslationEntry::new(harvested.id, harvested.english_text);
                entry.comment = harvested.comment;
                entry.tooltip_text = harvested.tooltip_text;
                entry.shortcut_key_text = harvested.shortcut_key_text;
                self.insert(entry);
            }
        }
    }

    /// Layers `other` on top of `self`: its translations win, its metadata fills gaps.
    pub fn overlay(&mut self, other: Self) {
        for (id, incoming) in other.entries {
            match self.entries.get_mut(&id) {
                Some(existing) => {
                    if !incoming.english_text.is_empty() {
                        existing.set_english_text(incoming.english_text);
                    }
                    existing.comment = incoming.comment.or_else(|| existing.comment.take());
                    existing.tooltip_text =
                        incoming.tooltip_text.or_else(|| existing.tooltip_text.take());
                    existing.shortcut_key_text =
                        incoming.shortcut_key_text.or_else(|| existing.shortcut_key_text.take());
                    existing.dynamic |= incoming.dynamic;
                    for (language, translation) in incoming.translations {
                        if language != ENGLISH {
                            existing.translations.insert(language, translation);
                        }
                    }
                }
                None => {
                    self.entries.insert(id, incoming);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslationEntry> {
        self.entries.values()
    }

    /// Entries ordered by id, for deterministic export.
    #[must_use]
    pub fn entries_sorted(&self) -> Vec<&TranslationEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.id().cmp(b.id()));
        entries
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn count_translated(&self, language: &str) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.translation(language).is_some_and(Translation::is_translated))
            .count()
    }

    #[must_use]
    pub fn count_approved(&self, language: &str) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.translation(language).is_some_and(Translation::is_approved))
            .count()
    }

    /// Languages with at least one non-empty translation.
    #[must_use]
    pub fn languages(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .flat_map(|entry| entry.translations.iter())
            .filter(|(_, translation)| translation.is_translated())
            .map(|(language, _)| language.clone())
            .collect()
    }
}

impl FromIterator<TranslationEntry> for EntryStore {
    fn from_iter<I: IntoIterator<Item = TranslationEntry>>(iter: I) -> Self {
        let mut store = Self::new();
        for entry in iter {
            store.insert(entry);
        }
        store
    }
}

impl FromIterator<HarvestedString> for EntryStore {
    fn from_iter<I: IntoIterator<Item = HarvestedString>>(iter: I) -> Self {
        let mut store = Self::new();
        for harvested in iter {
            store.harvest(harvested);
        }
        store
    }
}
