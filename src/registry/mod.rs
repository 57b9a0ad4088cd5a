//! Process-wide set of localization managers
//!
//! A [`ManagerRegistry`] is a cheap clone handle. Managers are created once per
//! application id and share one set of language preferences.
/// Events sent to UI code
mod events;
/// Per-application manager
mod manager;
/// Shared language preferences
mod state;

use std::collections::{
    BTreeMap,
    BTreeSet,
    HashSet,
};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

pub use events::LocalizationEvent;
pub use manager::{
    Manager,
    ManagerParams,
};
pub use state::LanguagePreferences;
use state::LanguageState;

use crate::config::{
    ConfigError,
    ConfigManager,
    L10nSettings,
};
use crate::document::{
    BackingKind,
    FileLayout,
    is_language_code,
};
use crate::error::L10nError;
use crate::resolver::resolve;
use crate::store::EntryStore;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 256;

/// Live managers and the ids of disposed ones.
#[derive(Debug, Default)]
struct Managers {
    /// Keyed by application id, iterated in id order
    live: BTreeMap<String, Arc<Manager>>,
    /// Disposed ids that cannot be created again until forgotten
    disposed: HashSet<String>,
}

/// State shared by every clone of a registry and referenced weakly by its managers.
///
/// # Lock order
///
/// 1. `managers`
/// 2. a manager's store
/// 3. `languages`
#[derive(Debug)]
pub(crate) struct RegistryShared {
    /// File format of every manager
    kind: BackingKind,
    /// File placement of every manager
    layout: FileLayout,
    /// Registered managers
    managers: Mutex<Managers>,
    /// Shared language preferences
    languages: Arc<LanguageState>,
    /// Event channel
    events: broadcast::Sender<LocalizationEvent>,
}

impl RegistryShared {
    /// Marks `manager` disposed, removes it from the live set and reserves its id.
    ///
    /// Both happen under the map lock, so `create` and `get` never hand out a
    /// disposed manager. Returns `false` when it was already disposed.
    fn unregister(&self, app_id: &str, manager: &Manager) -> bool {
        let mut managers = self.managers.lock();
        if !manager.mark_disposed() {
            return false;
        }
        if managers.live.get(app_id).is_some_and(|live| std::ptr::eq(Arc::as_ptr(live), manager)) {
            managers.live.remove(app_id);
            managers.disposed.insert(app_id.to_string());
        }
        true
    }
}

/// Creates and looks up [`Manager`]s.
#[derive(Debug, Clone)]
pub struct ManagerRegistry {
    /// Shared state
    shared: Arc<RegistryShared>,
}

impl ManagerRegistry {
    #[must_use]
    pub fn new(settings: &L10nSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        tracing::debug!(kind = %settings.backing_kind, "Creating localization registry");
        Self {
            shared: Arc::new(RegistryShared {
                kind: settings.backing_kind,
                layout: settings.layout,
                managers: Mutex::new(Managers::default()),
                languages: Arc::new(LanguageState::new(LanguagePreferences::from(settings))),
                events,
            }),
        }
    }

    /// Builds a registry from `.tm-l10n.json` in `root`, or defaults when absent.
    pub fn from_config_root(root: &Path) -> Result<Self, L10nError> {
        let mut config = ConfigManager::new();
        config.load_settings(Some(root.to_path_buf()))?;
        Ok(Self::new(config.get_settings()))
    }

    /// Pushes the language settings of `settings` into every manager.
    ///
    /// `backingKind` and `layout` are fixed when the registry is built; a
    /// different value is logged and ignored.
    pub fn apply_settings(&self, settings: &L10nSettings) -> Result<(), L10nError> {
        settings.validate().map_err(ConfigError::ValidationErrors)?;
        if settings.backing_kind != self.shared.kind || settings.layout != self.shared.layout {
            tracing::warn!(
                kind = %settings.backing_kind,
                layout = ?settings.layout,
                "File format changes need a new registry; keeping the current one"
            );
        }

        self.set_fallback_languages(&settings.fallback_languages)?;
        self.set_return_only_approved(settings.return_only_approved_strings);
        if settings.ui_language != self.ui_language() {
            self.set_ui_language(&settings.ui_language)?;
        }
        Ok(())
    }

    /// Re-reads the settings file of `config` and applies it when it changed.
    ///
    /// Returns whether anything was applied.
    pub fn reload_settings(&self, config: &mut ConfigManager) -> Result<bool, L10nError> {
        if !config.reload()? {
            return Ok(false);
        }
        self.apply_settings(config.get_settings())?;
        Ok(true)
    }

    #[must_use]
    pub fn backing_kind(&self) -> BackingKind {
        self.shared.kind
    }

    #[must_use]
    pub fn layout(&self) -> FileLayout {
        self.shared.layout
    }

    /// Returns the manager for `params.app_id`, loading it on first use.
    ///
    /// The registry lock is held while loading, so an application is read once
    /// even when several threads ask for it at the same time.
    pub fn create(&self, params: ManagerParams) -> Result<Arc<Manager>, L10nError> {
        params.validate()?;
        let mut managers = self.shared.managers.lock();

        if managers.disposed.contains(&params.app_id) {
            return Err(L10nError::UseAfterDispose(params.app_id));
        }
        if let Some(manager) = managers.live.get(&params.app_id) {
            tracing::debug!(app_id = %params.app_id, "Reusing localization manager");
            return Ok(Arc::clone(manager));
        }

        let app_id = params.app_id.clone();
        let manager = Arc::new(Manager::load(params, &self.shared));
        managers.live.insert(app_id, Arc::clone(&manager));
        Ok(manager)
    }

    /// Looks up a manager created earlier.
    pub fn get(&self, app_id: &str) -> Result<Arc<Manager>, L10nError> {
        let managers = self.shared.managers.lock();
        if let Some(manager) = managers.live.get(app_id) {
            return Ok(Arc::clone(manager));
        }
        if managers.disposed.contains(app_id) {
            return Err(L10nError::UseAfterDispose(app_id.to_string()));
        }
        Err(L10nError::UnknownApplicationId(app_id.to_string()))
    }

    /// Disposes the manager of `app_id`.
    pub fn dispose(&self, app_id: &str) -> Result<(), L10nError> {
        self.get(app_id)?.dispose()
    }

    /// Releases disposed ids so they can be created again. Returns how many were released.
    pub fn forget_disposed_managers(&self) -> usize {
        let forgotten = std::mem::take(&mut self.shared.managers.lock().disposed);
        if !forgotten.is_empty() {
            tracing::debug!(count = forgotten.len(), "Forgot disposed localization managers");
        }
        forgotten.len()
    }

    /// Application ids of live managers, sorted.
    #[must_use]
    pub fn loaded_app_ids(&self) -> Vec<String> {
        self.shared.managers.lock().live.keys().cloned().collect()
    }

    /// Live managers in application id order, taken without holding the lock afterwards.
    fn live_managers(&self) -> Vec<Arc<Manager>> {
        self.shared.managers.lock().live.values().cloned().collect()
    }

    #[must_use]
    pub fn preferences(&self) -> LanguagePreferences {
        self.shared.languages.snapshot()
    }

    #[must_use]
    pub fn ui_language(&self) -> String {
        self.preferences().ui_language
    }

    /// Changes the UI language and asks every manager to reapply it.
    pub fn set_ui_language(&self, language: &str) -> Result<(), L10nError> {
        if !is_language_code(language) {
            return Err(L10nError::InvalidArgument(format!("invalid UI language '{language}'")));
        }
        self.shared.languages.update(|preferences| language.clone_into(&mut preferences.ui_language));

        for manager in self.live_managers() {
            manager.reapply(language);
        }

        let available = self.available_localized_languages();
        if !available.is_empty() && !available.contains(language) {
            tracing::warn!(language, ?available, "No translations for UI language");
        }
        tracing::info!(language, "UI language changed");
        Ok(())
    }

    /// Replaces the fallback list. Repeated codes keep their first position.
    pub fn set_fallback_languages(&self, languages: &[String]) -> Result<(), L10nError> {
        if let Some(invalid) = languages.iter().find(|language| !is_language_code(language)) {
            return Err(L10nError::InvalidArgument(format!("invalid fallback language '{invalid}'")));
        }
        let mut fallback: Vec<String> = Vec::with_capacity(languages.len());
        for language in languages {
            if !fallback.contains(language) {
                fallback.push(language.clone());
            }
        }
        tracing::debug!(?fallback, "Fallback languages changed");
        self.shared.languages.update(|preferences| preferences.fallback_languages = fallback);
        Ok(())
    }

    pub fn set_return_only_approved(&self, approved_only: bool) {
        tracing::debug!(approved_only, "Approval policy changed");
        self.shared.languages.update(|preferences| preferences.return_only_approved = approved_only);
    }

    /// Languages with at least one translated string in any live manager.
    #[must_use]
    pub fn available_localized_languages(&self) -> BTreeSet<String> {
        self.live_managers()
            .iter()
            .filter_map(|manager| manager.languages().ok())
            .flatten()
            .collect()
    }

    /// Looks up `id` in the manager of `app_id`.
    pub fn get_string(
        &self,
        app_id: &str,
        id: &str,
        english: Option<&str>,
    ) -> Result<String, L10nError> {
        self.get(app_id)?.get_string(id, english)
    }

    /// Looks up `id` in the first live manager, by application id, that knows it.
    #[must_use]
    pub fn get_string_from_any(&self, id: &str, english: Option<&str>) -> String {
        for manager in self.live_managers() {
            if manager.has_string(id).unwrap_or(false)
                && let Ok(text) = manager.get_string(id, english)
            {
                return text;
            }
        }
        resolve(&EntryStore::new(), id, english, &[], false).text
    }

    /// Receives every event sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LocalizationEvent> {
        self.shared.events.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;
    use tempfile::TempDir;

    use super::*;
    use crate::test_utils::{
        create_store,
        write_store,
    };

    #[fixture]
    fn installed() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let store = create_store(&[
            ("Menu.File", "File", &[("fr", "Fichier", true), ("de", "Datei", true)]),
            ("Menu.Edit", "Edit", &[("fr", "Édition", false)]),
        ]);
        write_store(temp_dir.path(), BackingKind::Xliff, "Editor", Some("2.0"), &store);
        temp_dir
    }

    fn registry() -> ManagerRegistry {
        ManagerRegistry::new(&L10nSettings {
            backing_kind: BackingKind::Xliff,
            ..L10nSettings::default()
        })
    }

    #[rstest]
    fn create_is_idempotent(installed: TempDir) {
        let registry = registry();
        let params = ManagerParams::new("Editor").with_installed_dir(installed.path());

        let first = registry.create(params.clone()).unwrap();
        let second = registry.create(params).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &registry.get("Editor").unwrap()));
        assert_that!(registry.loaded_app_ids(), elements_are![eq("Editor")]);
    }

    #[rstest]
    fn unknown_and_disposed_ids_are_distinct(installed: TempDir) {
        let registry = registry();
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

        registry.dispose("Editor").unwrap();

        assert!(matches!(registry.get("Viewer"), Err(L10nError::UnknownApplicationId(_))));
        assert!(matches!(registry.get("Editor"), Err(L10nError::UseAfterDispose(_))));
        assert!(matches!(
            registry.create(ManagerParams::new("Editor")),
            Err(L10nError::UseAfterDispose(_))
        ));
    }

    #[rstest]
    fn forgotten_ids_can_be_created_again(installed: TempDir) {
        let registry = registry();
        let params = ManagerParams::new("Editor").with_installed_dir(installed.path());
        let disposed = registry.create(params.clone()).unwrap();
        disposed.dispose().unwrap();

        let forgotten = registry.forget_disposed_managers();
        let recreated = registry.create(params).unwrap();

        assert_that!(forgotten, eq(1));
        assert!(!Arc::ptr_eq(&disposed, &recreated));
        assert_that!(recreated.string_count().unwrap(), eq(2));
        assert!(matches!(disposed.string_count(), Err(L10nError::UseAfterDispose(_))));
    }

    #[rstest]
    fn set_ui_language_reapplies_every_manager(installed: TempDir) {
        let registry = registry();
        let editor =
            registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();
        registry.create(ManagerParams::new("Viewer")).unwrap();
        let mut events = registry.subscribe();

        registry.set_ui_language("fr").unwrap();

        assert_that!(editor.applied_language().unwrap().as_str(), eq("fr"));
        assert_that!(editor.get_string("Menu.File", None).unwrap().as_str(), eq("Fichier"));
        let mut reapplied: Vec<String> = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let LocalizationEvent::Reapply { app_id, ui_language } = event {
                assert_that!(ui_language.as_str(), eq("fr"));
                reapplied.push(app_id);
            }
        }
        assert_that!(reapplied, elements_are![eq("Editor"), eq("Viewer")]);
    }

    #[rstest]
    #[case::empty("")]
    #[case::malformed("fr FR")]
    fn set_ui_language_rejects_bad_codes(#[case] language: &str) {
        let registry = registry();

        let result = registry.set_ui_language(language);

        assert!(matches!(result, Err(L10nError::InvalidArgument(_))));
        assert_that!(registry.ui_language().as_str(), eq("en"));
    }

    #[rstest]
    fn fallback_languages_are_deduplicated() {
        let registry = registry();
        let languages: Vec<String> = ["de", "es", "de"].iter().map(ToString::to_string).collect();

        registry.set_fallback_languages(&languages).unwrap();

        assert_that!(registry.preferences().fallback_languages, elements_are![eq("de"), eq("es")]);
    }

    #[rstest]
    fn available_languages_span_live_managers(installed: TempDir) {
        let registry = registry();
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();
        let viewer = registry.create(ManagerParams::new("Viewer")).unwrap();
        viewer.get_dynamic_string("Status", "Ready").unwrap();

        let available = registry.available_localized_languages();

        assert_that!(available, elements_are![eq("de"), eq("en"), eq("fr")]);
    }

    #[rstest]
    fn get_string_from_any_searches_in_app_id_order(installed: TempDir) {
        let registry = registry();
        registry.set_ui_language("de").unwrap();
        let aardvark = registry.create(ManagerParams::new("Aardvark")).unwrap();
        aardvark.get_dynamic_string("Status", "Ready").unwrap();
        registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

        assert_that!(registry.get_string_from_any("Menu.File", Some("File")).as_str(), eq("Datei"));
        assert_that!(registry.get_string_from_any("Status", None).as_str(), eq("Ready"));
        assert_that!(registry.get_string_from_any("Nowhere", None).as_str(), eq("Nowhere"));
    }

    #[rstest]
    fn apply_settings_updates_live_managers(installed: TempDir) {
        let registry = registry();
        let editor =
            registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();
        let settings = L10nSettings {
            backing_kind: BackingKind::Xliff,
            ui_language: "ja".to_string(),
            fallback_languages: vec!["fr".to_string()],
            return_only_approved_strings: true,
            ..L10nSettings::default()
        };

        registry.apply_settings(&settings).unwrap();

        assert_that!(editor.applied_language().unwrap().as_str(), eq("ja"));
        assert_that!(editor.get_string("Menu.File", None).unwrap().as_str(), eq("Fichier"));
        assert_that!(editor.get_string("Menu.Edit", None).unwrap().as_str(), eq("Edit"));
    }

    #[rstest]
    fn apply_settings_rejects_invalid_settings() {
        let registry = registry();
        let settings = L10nSettings {
            fallback_languages: vec!["de".to_string(), "de".to_string()],
            ..L10nSettings::default()
        };

        let result = registry.apply_settings(&settings);

        assert!(matches!(result, Err(L10nError::Config(ConfigError::ValidationErrors(_)))));
        assert_that!(registry.preferences().fallback_languages, is_empty());
    }

    #[rstest]
    fn reload_settings_applies_changed_file(installed: TempDir) {
        let root = TempDir::new().unwrap();
        let path = root.path().join(crate::config::CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"backingKind": "xliff"}"#).unwrap();
        let mut config = ConfigManager::new();
        config.load_settings(Some(root.path().to_path_buf())).unwrap();
        let registry = ManagerRegistry::new(config.get_settings());
        let editor =
            registry.create(ManagerParams::new("Editor").with_installed_dir(installed.path())).unwrap();

        let unchanged = registry.reload_settings(&mut config).unwrap();
        std::fs::write(&path, r#"{"backingKind": "xliff", "uiLanguage": "de"}"#).unwrap();
        let changed = registry.reload_settings(&mut config).unwrap();

        assert_that!(unchanged, eq(false));
        assert_that!(changed, eq(true));
        assert_that!(editor.get_string("Menu.File", None).unwrap().as_str(), eq("Datei"));
    }

    #[rstest]
    fn live_managers_are_never_disposed(installed: TempDir) {
        let registry = registry();
        let params = ManagerParams::new("Editor").with_installed_dir(installed.path());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let registry = registry.clone();
                let params = params.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        if let Ok(manager) = registry.create(params.clone()) {
                            let _ = manager.dispose();
                        }
                        registry.forget_disposed_managers();
                    }
                });
            }
            for _ in 0..200 {
                let managers = registry.shared.managers.lock();
                assert!(managers.live.values().all(|manager| !manager.is_disposed()));
            }
        });
    }

    #[rstest]
    fn dialog_notifications_are_broadcast() {
        let registry = registry();
        let manager = registry.create(ManagerParams::new("Editor")).unwrap();
        let mut events = registry.subscribe();

        manager.notify_dialog_opening().unwrap();
        manager.notify_dialog_closing().unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            LocalizationEvent::DialogOpening { app_id: "Editor".to_string() }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            LocalizationEvent::DialogClosing { app_id: "Editor".to_string() }
        );
    }
}
