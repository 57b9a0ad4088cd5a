//! Test helpers
//!
//! Builders shared by the unit tests of several modules.
#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::path::Path;

use crate::document::{
    BackingKind,
    FileLayout,
    TmDocument,
};
use crate::store::{
    EntryStore,
    HarvestedString,
};

/// Builds an `EntryStore`
///
/// # Arguments
/// * `entries` - `(id, english, [(language, text, approved)])`
pub(crate) fn create_store(entries: &[(&str, &str, &[(&str, &str, bool)])]) -> EntryStore {
    let mut store = EntryStore::new();
    for (id, english, translations) in entries {
        store.harvest(HarvestedString::new(*id, *english));
        for (language, text, approved) in *translations {
            store.upsert_translation(id, language, text, *approved, None, None);
        }
    }
    store
}

/// Writes one file per language of `store` into `dir`
///
/// # Arguments
/// * `dir` - target directory
/// * `app_id` - application id
/// * `version` - application version to record
pub(crate) fn write_store(
    dir: &Path,
    kind: BackingKind,
    app_id: &str,
    version: Option<&str>,
    store: &EntryStore,
) {
    for language in store.languages() {
        let path = FileLayout::FilePerLanguage.file_path(dir, app_id, &language, kind);
        TmDocument::from_entry_store(kind, store, app_id, &language, version).write(&path).unwrap();
    }
}
