//! Reconciliation of previous translator work with a fresh harvest

use crate::document::{
    DocumentError,
    TmDocument,
};
use crate::store::{
    EntryStore,
    TranslationEntry,
};

/// What a merge did, for logging and re-review.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Ids carried over from the previous store
    pub kept: usize,
    /// Ids that exist only in the harvest
    pub added: usize,
    /// Ids removed because the harvest no longer contains them
    pub dropped: usize,
    /// Ids whose English text changed while translations survived, sorted
    pub english_changed: Vec<String>,
}

/// `Some` with at least one character.
fn non_empty(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Combines one previously kept entry with its harvested counterpart.
fn merge_entry(mut kept: TranslationEntry, harvested: TranslationEntry) -> (TranslationEntry, bool) {
    let english_changed = !kept.english_text.is_empty()
        && kept.english_text != harvested.english_text
        && kept.foreign_translations().next().is_some();

    if !non_empty(kept.comment.as_ref()) && non_empty(harvested.comment.as_ref()) {
        kept.comment = harvested.comment.clone();
    }
    if harvested.tooltip_text.is_some() {
        kept.tooltip_text = harvested.tooltip_text.clone();
    }
    if harvested.shortcut_key_text.is_some() {
        kept.shortcut_key_text = harvested.shortcut_key_text.clone();
    }
    kept.dynamic = harvested.dynamic;

    for (language, translation) in harvested.foreign_translations() {
        if !kept.translation(language).is_some_and(|t| t.is_translated()) {
            kept.translations.insert(language.clone(), translation.clone());
        }
    }
    kept.set_english_text(harvested.english_text);

    (kept, english_changed)
}

/// Merges `installed` (earlier translator work) into `harvested` (the current baseline).
///
/// Translations and approval survive on every id still harvested, even when its
/// English text changed. Ids no longer harvested are dropped unless dynamic.
#[must_use]
pub fn merge(installed: &EntryStore, harvested: &EntryStore) -> (EntryStore, MergeReport) {
    let mut report = MergeReport::default();
    let mut merged = EntryStore::new();

    for entry in harvested.iter() {
        match installed.get(entry.id()) {
            Some(previous) => {
                let (entry, english_changed) = merge_entry(previous.clone(), entry.clone());
                if english_changed {
                    report.english_changed.push(entry.id().to_string());
                }
                merged.insert(entry);
                report.kept += 1;
            }
            None => {
                merged.insert(entry.clone());
                report.added += 1;
            }
        }
    }

    for entry in installed.iter().filter(|entry| !harvested.contains(entry.id())) {
        if entry.dynamic {
            merged.insert(entry.clone());
            report.kept += 1;
        } else {
            tracing::debug!(id = entry.id(), "Dropping string missing from harvest");
            report.dropped += 1;
        }
    }

    report.english_changed.sort();
    tracing::info!(
        kept = report.kept,
        added = report.added,
        dropped = report.dropped,
        english_changed = report.english_changed.len(),
        "Merged translation memory"
    );
    (merged, report)
}

/// Merges against an installed document that may be missing or unreadable.
///
/// Any failure degrades to the harvest as-is.
#[must_use]
pub fn merge_with_installed(
    harvested: &EntryStore,
    installed: Result<TmDocument, DocumentError>,
) -> (EntryStore, MergeReport) {
    match installed {
        Ok(document) => merge(&document.to_entry_store(), harvested),
        Err(error) => {
            if error.is_not_found() {
                tracing::debug!("No installed translation memory: {error}");
            } else {
                tracing::warn!("Ignoring unreadable translation memory: {error}");
            }
            let report = MergeReport { added: harvested.total_count(), ..MergeReport::default() };
            (harvested.clone(), report)
        }
    }
}
