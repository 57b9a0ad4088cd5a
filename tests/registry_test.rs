//! Registry and manager behavior over real files

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use googletest::prelude::*;
use rstest::*;
use tempfile::TempDir;
use tm_l10n::config::L10nSettings;
use tm_l10n::document::{
    BackingKind,
    DocumentError,
    FileLayout,
    TmDocument,
};
use tm_l10n::store::{
    EntryStore,
    HarvestedString,
};
use tm_l10n::{
    L10nError,
    ManagerParams,
    ManagerRegistry,
};

fn languages(codes: &[&str]) -> Vec<String> {
    codes.iter().map(ToString::to_string).collect()
}

fn write_all(dir: &Path, kind: BackingKind, app_id: &str, version: &str, store: &EntryStore) {
    for language in store.languages() {
        let path = FileLayout::FilePerLanguage.file_path(dir, app_id, &language, kind);
        TmDocument::from_entry_store(kind, store, app_id, &language, Some(version))
            .write(&path)
            .unwrap();
    }
}

fn registry(kind: BackingKind) -> ManagerRegistry {
    ManagerRegistry::new(&L10nSettings { backing_kind: kind, ..L10nSettings::default() })
}

/// Installed files of Editor 2.0
#[fixture]
fn installed() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let mut store = EntryStore::new();
    store.harvest(HarvestedString::new("Greeting", "Hello"));
    store.upsert_translation("Greeting", "es", "Hola", true, None, None);
    store.harvest(HarvestedString::new("Save", "Save"));
    store.upsert_translation("Save", "fr", "Enregistrer", false, None, None);
    store.upsert_translation("Save", "de", "Speichern", true, None, None);
    store.harvest(HarvestedString::new("Quit", "Quit"));
    write_all(temp_dir.path(), BackingKind::Xliff, "Editor", "2.0", &store);
    temp_dir
}

#[rstest]
fn lookup_follows_fallback_order(installed: TempDir) {
    let registry = registry(BackingKind::Xliff);
    registry.set_ui_language("fr").unwrap();
    registry.set_fallback_languages(&languages(&["de", "es"])).unwrap();
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    let greeting = editor.resolve("Greeting", None, None).unwrap();
    let quit = editor.resolve("Quit", None, None).unwrap();

    assert_that!(greeting.text.as_str(), eq("Hola"));
    assert_that!(greeting.language.as_str(), eq("es"));
    assert_that!(quit.language.as_str(), eq("en"));
}

#[rstest]
fn caller_english_wins_over_stored_english(installed: TempDir) {
    let registry = registry(BackingKind::Xliff);
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    assert_that!(editor.get_string("Quit", Some("Exit")).unwrap().as_str(), eq("Exit"));
    assert_that!(editor.get_string("Quit", None).unwrap().as_str(), eq("Quit"));
    assert_that!(editor.get_string("Missing", None).unwrap().as_str(), eq("Missing"));
}

#[rstest]
fn approved_only_skips_unapproved_translations(installed: TempDir) {
    let registry = registry(BackingKind::Xliff);
    registry.set_ui_language("fr").unwrap();
    registry.set_fallback_languages(&languages(&["de"])).unwrap();
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    let any = editor.get_string("Save", None).unwrap();
    registry.set_return_only_approved(true);
    let approved = editor.get_string("Save", None).unwrap();

    assert_that!(any.as_str(), eq("Enregistrer"));
    assert_that!(approved.as_str(), eq("Speichern"));
    assert_that!(editor.is_string_available_for_lang("Save", "fr").unwrap(), eq(false));
}

#[rstest]
fn preferred_languages_override_shared_list(installed: TempDir) {
    let registry = registry(BackingKind::Xliff);
    registry.set_ui_language("fr").unwrap();
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    let text = editor.get_string_in("Save", None, &languages(&["de"])).unwrap();

    assert_that!(text.as_str(), eq("Speichern"));
}

#[rstest]
fn concurrent_creation_yields_one_manager(installed: TempDir) {
    let registry = registry(BackingKind::Xliff);

    let managers: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let dir = installed.path().to_path_buf();
                scope.spawn(move || {
                    registry.create(ManagerParams::new("Editor").with_installed_dir(dir)).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(managers.iter().all(|manager| Arc::ptr_eq(manager, &managers[0])));
    assert_that!(registry.loaded_app_ids(), elements_are![eq("Editor")]);
}

#[rstest]
#[case::tmx(BackingKind::Tmx)]
#[case::xliff(BackingKind::Xliff)]
fn newer_installed_version_merges_translator_work(#[case] kind: BackingKind) {
    let installed = TempDir::new().unwrap();
    let writable = TempDir::new().unwrap();
    let mut baseline = EntryStore::new();
    baseline.harvest(HarvestedString::new("Open", "Open…"));
    baseline.harvest(HarvestedString::new("Close", "Close"));
    write_all(installed.path(), kind, "Editor", "2.0", &baseline);
    let mut work = EntryStore::new();
    work.harvest(HarvestedString::new("Open", "Open"));
    work.upsert_translation("Open", "fr", "Ouvrir", true, None, None);
    work.harvest(HarvestedString::new("Removed", "Removed"));
    work.upsert_translation("Removed", "fr", "Supprimé", true, None, None);
    write_all(writable.path(), kind, "Editor", "1.0", &work);

    let registry = registry(kind);
    registry.set_ui_language("fr").unwrap();
    let editor = registry
        .create(
            ManagerParams::new("Editor")
                .with_app_version("2.0")
                .with_installed_dir(installed.path())
                .with_writable_dir(writable.path()),
        )
        .unwrap();

    assert_that!(editor.get_string("Open", None).unwrap().as_str(), eq("Ouvrir"));
    assert_that!(editor.get_string("Open", Some("Open…")).unwrap().as_str(), eq("Ouvrir"));
    assert_that!(editor.number_approved("fr").unwrap(), eq(1));
    assert_that!(editor.has_string("Removed").unwrap(), eq(false));
    assert_that!(editor.string_count().unwrap(), eq(2));
}

#[rstest]
fn same_version_working_copy_overlays_baseline(installed: TempDir) {
    let writable = TempDir::new().unwrap();
    let mut work = EntryStore::new();
    work.harvest(HarvestedString::new("Quit", "Quit"));
    work.upsert_translation("Quit", "fr", "Quitter", true, None, None);
    write_all(writable.path(), BackingKind::Xliff, "Editor", "2.0", &work);

    let registry = registry(BackingKind::Xliff);
    registry.set_ui_language("fr").unwrap();
    let editor = registry
        .create(
            ManagerParams::new("Editor")
                .with_installed_dir(installed.path())
                .with_writable_dir(writable.path()),
        )
        .unwrap();

    assert_that!(editor.get_string("Quit", None).unwrap().as_str(), eq("Quitter"));
    assert_that!(editor.get_string("Save", None).unwrap().as_str(), eq("Enregistrer"));
}

#[rstest]
#[case::tmx(BackingKind::Tmx)]
#[case::xliff(BackingKind::Xliff)]
fn dynamic_strings_survive_save_and_reload(#[case] kind: BackingKind) {
    let writable = TempDir::new().unwrap();
    let registry = registry(kind);
    let params = ManagerParams::new("Editor").with_app_version("1.0").with_writable_dir(writable.path());
    let editor = registry.create(params.clone()).unwrap();

    let first = editor.get_dynamic_string("Tab.Untitled", "Untitled").unwrap();
    let saved = editor.save().unwrap();
    editor.dispose().unwrap();
    assert_that!(registry.forget_disposed_managers(), eq(1));
    let reloaded = registry.create(params).unwrap();

    assert_that!(first.as_str(), eq("Untitled"));
    assert_that!(saved.len(), eq(1));
    assert_that!(reloaded.has_string("Tab.Untitled").unwrap(), eq(true));
    assert_that!(reloaded.get_string("Tab.Untitled", None).unwrap().as_str(), eq("Untitled"));
    let report = reloaded.apply_harvest([HarvestedString::new("Other", "Other")]).unwrap();
    assert_that!(report.dropped, eq(0));
    assert_that!(reloaded.has_string("Tab.Untitled").unwrap(), eq(true));
}

#[rstest]
fn statistics_are_ordered(installed: TempDir) {
    let registry = registry(BackingKind::Xliff);
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();
    editor.get_dynamic_string("Runtime", "Runtime").unwrap();

    let count = editor.string_count().unwrap();
    for language in ["en", "fr", "de", "es", "ja"] {
        let approved = editor.number_approved(language).unwrap();
        let translated = editor.number_translated(language).unwrap();
        assert!(approved <= translated, "{language}: {approved} > {translated}");
        assert!(translated <= count, "{language}: {translated} > {count}");
        assert!(editor.fraction_approved(language).unwrap() <= editor.fraction_translated(language).unwrap());
    }
    assert_that!(count, eq(4));
    assert_that!(editor.number_translated("fr").unwrap(), eq(1));
    assert_that!(editor.number_approved("fr").unwrap(), eq(0));
}

#[rstest]
fn disposed_manager_rejects_calls(installed: TempDir) {
    let registry = registry(BackingKind::Xliff);
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    editor.dispose().unwrap();

    assert!(matches!(editor.get_string("Save", None), Err(L10nError::UseAfterDispose(_))));
    assert!(matches!(editor.dispose(), Err(L10nError::UseAfterDispose(_))));
    assert!(matches!(registry.get("Editor"), Err(L10nError::UseAfterDispose(_))));
    assert!(matches!(registry.get("Viewer"), Err(L10nError::UnknownApplicationId(_))));
}

#[rstest]
fn unreadable_files_are_skipped(installed: TempDir) {
    let broken = FileLayout::FilePerLanguage.file_path(installed.path(), "Editor", "ja", BackingKind::Xliff);
    fs::write(&broken, "<xliff><file original=\"Editor\">").unwrap();

    let registry = registry(BackingKind::Xliff);
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    assert_that!(editor.string_count().unwrap(), eq(3));
    assert!(matches!(
        TmDocument::read(BackingKind::Xliff, &broken),
        Err(DocumentError::Format { .. })
    ));
    assert!(matches!(
        TmDocument::read(BackingKind::Xliff, &installed.path().join("Editor.pt.xlf")),
        Err(DocumentError::NotFound(_))
    ));
}

#[rstest]
fn tooltip_and_shortcut_are_exposed() {
    let installed = TempDir::new().unwrap();
    let mut store = EntryStore::new();
    store.harvest(HarvestedString {
        tooltip_text: Some("Save the document".to_string()),
        shortcut_key_text: Some("Ctrl+S".to_string()),
        ..HarvestedString::new("Save", "Save")
    });
    write_all(installed.path(), BackingKind::Tmx, "Editor", "1.0", &store);

    let registry = registry(BackingKind::Tmx);
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    assert_that!(editor.get_tooltip("Save").unwrap().as_deref(), some(eq("Save the document")));
    assert_that!(editor.get_shortcut_keys("Save").unwrap().as_deref(), some(eq("Ctrl+S")));
    assert_that!(editor.get_tooltip("Missing").unwrap(), none());
}

#[rstest]
fn registry_reads_settings_file(installed: TempDir) {
    let config = TempDir::new().unwrap();
    fs::write(
        config.path().join(".tm-l10n.json"),
        r#"{"backingKind": "xliff", "uiLanguage": "de", "fallbackLanguages": ["es"]}"#,
    )
    .unwrap();

    let registry = ManagerRegistry::from_config_root(config.path()).unwrap();
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    assert_that!(registry.backing_kind(), eq(BackingKind::Xliff));
    assert_that!(editor.get_string("Save", None).unwrap().as_str(), eq("Speichern"));
    assert_that!(editor.get_string("Greeting", None).unwrap().as_str(), eq("Hola"));
}

#[rstest]
fn unversioned_manager_keeps_harvest_across_reload(installed: TempDir) {
    let writable = TempDir::new().unwrap();
    let registry = registry(BackingKind::Xliff);
    let params = ManagerParams::new("Editor")
        .with_installed_dir(installed.path())
        .with_writable_dir(writable.path());
    let editor = registry.create(params.clone()).unwrap();

    editor.harvest([HarvestedString::new("Find", "Find")]).unwrap();
    let saved = editor.save().unwrap();
    editor.dispose().unwrap();
    registry.forget_disposed_managers();
    let reloaded = registry.create(params).unwrap();

    let english = saved.iter().find(|path| path.to_string_lossy().ends_with(".en.xlf")).unwrap();
    let document = TmDocument::read(BackingKind::Xliff, english).unwrap();
    assert_that!(document.app_version(), some(eq("2.0")));
    assert_that!(reloaded.has_string("Find").unwrap(), eq(true));
    assert_that!(reloaded.string_count().unwrap(), eq(4));
}

#[rstest]
#[case::any_translation(false)]
#[case::approved_only(true)]
fn dynamic_string_is_available_in_english(installed: TempDir, #[case] approved_only: bool) {
    let registry = registry(BackingKind::Xliff);
    registry.set_return_only_approved(approved_only);
    let editor =
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

    let text = editor.get_dynamic_string("Status.Ready", "New Text").unwrap();

    assert_that!(text.as_str(), eq("New Text"));
    assert_that!(editor.is_string_available_for_lang("Status.Ready", "en").unwrap(), eq(true));
    assert_that!(editor.is_string_available_for_lang("Status.Ready", "fr").unwrap(), eq(false));
}
