//! Per-application localization manager

use std::collections::BTreeSet;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::{
    Arc,
    Weak,
};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::RegistryShared;
use super::events::LocalizationEvent;
use super::state::LanguageState;
use crate::document::{
    BackingKind,
    FileLayout,
    TmDocument,
};
use crate::error::L10nError;
use crate::merge::{
    MergeReport,
    merge,
};
use crate::resolver::{
    Resolution,
    is_available,
    resolve,
};
use crate::store::{
    ENGLISH,
    EntryStore,
    HarvestedString,
};

/// Everything needed to create a [`Manager`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManagerParams {
    pub app_id: String,
    /// Display name; the id when not set
    pub app_name: Option<String>,
    /// Version written into saved files when the installed baseline has none
    pub app_version: Option<String>,
    /// Read-only baseline shipped with the application
    pub installed_dir: Option<PathBuf>,
    /// Translator working copy; [`Manager::save`] writes here
    pub writable_dir: Option<PathBuf>,
}

impl ManagerParams {
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self { app_id: app_id.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    #[must_use]
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    #[must_use]
    pub fn with_installed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.installed_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_writable_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.writable_dir = Some(dir.into());
        self
    }

    /// Rejects ids that cannot be used as a file name stem.
    pub(crate) fn validate(&self) -> Result<(), L10nError> {
        if self.app_id.is_empty() {
            return Err(L10nError::InvalidArgument("application id cannot be empty".to_string()));
        }
        if self.app_id.contains(['/', '\\']) || self.app_id.starts_with('.') {
            return Err(L10nError::InvalidArgument(format!(
                "application id '{}' cannot be used as a file name",
                self.app_id
            )));
        }
        Ok(())
    }
}

/// Localized strings of one application.
///
/// Obtained from [`super::ManagerRegistry::create`]. Every method fails with
/// [`L10nError::UseAfterDispose`] once [`Manager::dispose`] has run.
pub struct Manager {
    /// Application id, unique within a registry
    app_id: String,
    /// Display name
    app_name: String,
    /// Version the caller declared
    app_version: Option<String>,
    /// Version the working copy was compared against on load; stamped into saved files
    baseline_version: Option<String>,
    /// Target of [`Manager::save`]
    writable_dir: Option<PathBuf>,
    /// File format
    kind: BackingKind,
    /// File placement
    layout: FileLayout,
    /// Loaded strings
    store: RwLock<EntryStore>,
    /// Set once by [`Manager::dispose`]
    disposed: AtomicBool,
    /// UI language last applied to this application
    applied_language: RwLock<String>,
    /// Shared language settings
    languages: Arc<LanguageState>,
    /// Event channel of the owning registry
    events: broadcast::Sender<LocalizationEvent>,
    /// Owning registry, for unregistering on dispose
    registry: Weak<RegistryShared>,
}

impl Manager {
    /// Loads the installed baseline and the writable working copy.
    pub(super) fn load(params: ManagerParams, registry: &Arc<RegistryShared>) -> Self {
        let (store, baseline_version) = load_store(&params, registry.kind, registry.layout);
        tracing::info!(
            app_id = %params.app_id,
            version = ?baseline_version,
            strings = store.total_count(),
            languages = ?store.languages(),
            "Loaded localization manager"
        );

        let applied_language = registry.languages.snapshot().ui_language;
        Self {
            app_name: params.app_name.unwrap_or_else(|| params.app_id.clone()),
            app_id: params.app_id,
            app_version: params.app_version,
            baseline_version,
            writable_dir: params.writable_dir,
            kind: registry.kind,
            layout: registry.layout,
            store: RwLock::new(store),
            disposed: AtomicBool::new(false),
            applied_language: RwLock::new(applied_language),
            languages: Arc::clone(&registry.languages),
            events: registry.events.clone(),
            registry: Arc::downgrade(registry),
        }
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Fails once the manager has been disposed.
    fn ensure_live(&self) -> Result<(), L10nError> {
        if self.is_disposed() {
            return Err(L10nError::UseAfterDispose(self.app_id.clone()));
        }
        Ok(())
    }

    /// Resolves `id` with the shared candidate languages, or `preferred` when given.
    pub fn resolve(
        &self,
        id: &str,
        english: Option<&str>,
        preferred: Option<&[String]>,
    ) -> Result<Resolution, L10nError> {
        self.ensure_live()?;
        let preferences = self.languages.snapshot();
        let candidates = preferences.candidates(preferred);
        let store = self.store.read();
        Ok(resolve(&store, id, english, &candidates, preferences.return_only_approved))
    }

    /// Text for `id` in the UI language, following the fallback list.
    pub fn get_string(&self, id: &str, english: Option<&str>) -> Result<String, L10nError> {
        self.resolve(id, english, None).map(|resolution| resolution.text)
    }

    /// Text for `id` using `preferred` instead of the shared language list.
    pub fn get_string_in(
        &self,
        id: &str,
        english: Option<&str>,
        preferred: &[String],
    ) -> Result<String, L10nError> {
        self.resolve(id, english, Some(preferred)).map(|resolution| resolution.text)
    }

    /// Registers `id` as a runtime string, then resolves it.
    pub fn get_dynamic_string(&self, id: &str, english: &str) -> Result<String, L10nError> {
        self.ensure_live()?;
        let preferences = self.languages.snapshot();
        let mut store = self.store.write();

        if !store.get(id).is_some_and(|entry| entry.english_text == english)
            && store.upsert_translation(id, ENGLISH, english, true, Some(english), None)
        {
            tracing::debug!(app_id = %self.app_id, id, "Registered dynamic string");
        }

        let candidates = preferences.candidates(None);
        Ok(resolve(&store, id, Some(english), &candidates, preferences.return_only_approved).text)
    }

    /// Whether `language` holds a usable translation under the current approval policy.
    pub fn is_string_available_for_lang(&self, id: &str, language: &str) -> Result<bool, L10nError> {
        self.ensure_live()?;
        let approved_only = self.languages.snapshot().return_only_approved;
        Ok(is_available(&self.store.read(), id, language, approved_only))
    }

    pub fn has_string(&self, id: &str) -> Result<bool, L10nError> {
        self.ensure_live()?;
        Ok(self.store.read().contains(id))
    }

    pub fn get_tooltip(&self, id: &str) -> Result<Option<String>, L10nError> {
        self.ensure_live()?;
        Ok(self.store.read().get(id).and_then(|entry| entry.tooltip_text.clone()))
    }

    pub fn get_shortcut_keys(&self, id: &str) -> Result<Option<String>, L10nError> {
        self.ensure_live()?;
        Ok(self.store.read().get(id).and_then(|entry| entry.shortcut_key_text.clone()))
    }

    pub fn number_approved(&self, language: &str) -> Result<usize, L10nError> {
        self.ensure_live()?;
        Ok(self.store.read().count_approved(language))
    }

    pub fn number_translated(&self, language: &str) -> Result<usize, L10nError> {
        self.ensure_live()?;
        Ok(self.store.read().count_translated(language))
    }

    pub fn string_count(&self) -> Result<usize, L10nError> {
        self.ensure_live()?;
        Ok(self.store.read().total_count())
    }

    /// Share of strings approved in `language`; `0.0` for an empty store.
    pub fn fraction_approved(&self, language: &str) -> Result<f64, L10nError> {
        self.ensure_live()?;
        let store = self.store.read();
        Ok(fraction(store.count_approved(language), store.total_count()))
    }

    /// Share of strings translated in `language`; `0.0` for an empty store.
    pub fn fraction_translated(&self, language: &str) -> Result<f64, L10nError> {
        self.ensure_live()?;
        let store = self.store.read();
        Ok(fraction(store.count_translated(language), store.total_count()))
    }

    /// Languages with at least one non-empty translation.
    pub fn languages(&self) -> Result<BTreeSet<String>, L10nError> {
        self.ensure_live()?;
        Ok(self.store.read().languages())
    }

    /// Records harvested strings on top of the loaded store.
    pub fn harvest(
        &self,
        strings: impl IntoIterator<Item = HarvestedString>,
    ) -> Result<(), L10nError> {
        self.ensure_live()?;
        let mut store = self.store.write();
        let before = store.total_count();
        for harvested in strings {
            store.harvest(harvested);
        }
        tracing::debug!(
            app_id = %self.app_id,
            added = store.total_count().saturating_sub(before),
            "Harvested strings"
        );
        Ok(())
    }

    /// Replaces the store with its merge against a complete fresh harvest.
    pub fn apply_harvest(
        &self,
        strings: impl IntoIterator<Item = HarvestedString>,
    ) -> Result<MergeReport, L10nError> {
        self.ensure_live()?;
        let harvested: EntryStore = strings.into_iter().collect();
        let mut store = self.store.write();
        let (merged, report) = merge(&store, &harvested);
        *store = merged;
        Ok(report)
    }

    /// Builds the document for `language` from the live store.
    pub fn export(&self, language: &str) -> Result<TmDocument, L10nError> {
        self.ensure_live()?;
        let store = self.store.read();
        Ok(TmDocument::from_entry_store(
            self.kind,
            &store,
            &self.app_id,
            language,
            self.baseline_version.as_deref(),
        ))
    }

    /// Writes one file per language into the writable directory.
    pub fn save(&self) -> Result<Vec<PathBuf>, L10nError> {
        self.ensure_live()?;
        let Some(dir) = &self.writable_dir else {
            return Err(L10nError::InvalidArgument(format!(
                "application '{}' has no writable directory",
                self.app_id
            )));
        };

        let store = self.store.read();
        let mut written = Vec::new();
        for language in store.languages() {
            let path = self.layout.file_path(dir, &self.app_id, &language, self.kind);
            TmDocument::from_entry_store(
                self.kind,
                &store,
                &self.app_id,
                &language,
                self.baseline_version.as_deref(),
            )
            .write(&path)?;
            written.push(path);
        }
        tracing::info!(app_id = %self.app_id, files = written.len(), "Saved translation memory");
        Ok(written)
    }

    /// UI language most recently applied to this application.
    pub fn applied_language(&self) -> Result<String, L10nError> {
        self.ensure_live()?;
        Ok(self.applied_language.read().clone())
    }

    pub fn notify_dialog_opening(&self) -> Result<(), L10nError> {
        self.ensure_live()?;
        self.publish(LocalizationEvent::DialogOpening { app_id: self.app_id.clone() });
        Ok(())
    }

    pub fn notify_dialog_closing(&self) -> Result<(), L10nError> {
        self.ensure_live()?;
        self.publish(LocalizationEvent::DialogClosing { app_id: self.app_id.clone() });
        Ok(())
    }

    /// Switches this application to `ui_language` and tells the UI to refresh.
    pub(super) fn reapply(&self, ui_language: &str) {
        if self.is_disposed() {
            return;
        }
        *self.applied_language.write() = ui_language.to_string();
        self.publish(LocalizationEvent::Reapply {
            app_id: self.app_id.clone(),
            ui_language: ui_language.to_string(),
        });
    }

    /// Sets the disposed flag. Returns `false` when it was already set.
    #[must_use]
    pub(super) fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    /// Sends an event; having no subscriber is fine.
    fn publish(&self, event: LocalizationEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(app_id = %self.app_id, "No event subscribers");
        }
    }

    /// Releases the strings and unregisters from the registry.
    ///
    /// The id stays reserved until
    /// [`super::ManagerRegistry::forget_disposed_managers`] is called.
    pub fn dispose(&self) -> Result<(), L10nError> {
        let first = match self.registry.upgrade() {
            Some(registry) => registry.unregister(&self.app_id, self),
            None => self.mark_disposed(),
        };
        if !first {
            return Err(L10nError::UseAfterDispose(self.app_id.clone()));
        }
        *self.store.write() = EntryStore::new();
        tracing::info!(app_id = %self.app_id, "Disposed localization manager");
        Ok(())
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("app_id", &self.app_id)
            .field("app_version", &self.app_version)
            .field("baseline_version", &self.baseline_version)
            .field("kind", &self.kind)
            .field("disposed", &self.is_disposed())
            .field("store", &"<EntryStore>")
            .finish_non_exhaustive()
    }
}

/// `part / whole`, or `0.0` when `whole` is zero.
#[allow(clippy::cast_precision_loss, clippy::float_arithmetic)]
fn fraction(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

/// Reads every language file of `app_id` in `dir` into one store.
///
/// Unreadable files are skipped. Returns the first recorded application version.
fn read_directory(
    dir: &Path,
    app_id: &str,
    kind: BackingKind,
    layout: FileLayout,
) -> (EntryStore, Option<String>) {
    let mut store = EntryStore::new();
    let mut version = None;
    for (language, path) in layout.discover(dir, app_id, kind) {
        match TmDocument::read(kind, &path) {
            Ok(document) => {
                if version.is_none() {
                    version = document.app_version().map(ToString::to_string);
                }
                store.overlay(document.to_entry_store());
                tracing::debug!(app_id, %language, path = %path.display(), "Read translation memory");
            }
            Err(e) => {
                tracing::warn!(app_id, %language, "Skipping translation memory: {e}");
            }
        }
    }
    (store, version)
}

/// Installed baseline overlaid by the working copy, merged when their versions differ.
///
/// Returns the store and the baseline version. A working copy without a version
/// counts as belonging to the baseline.
fn load_store(
    params: &ManagerParams,
    kind: BackingKind,
    layout: FileLayout,
) -> (EntryStore, Option<String>) {
    let app_id = params.app_id.as_str();
    let (installed, installed_version) = params
        .installed_dir
        .as_deref()
        .map(|dir| read_directory(dir, app_id, kind, layout))
        .unwrap_or_default();

    let baseline_version = installed_version.or_else(|| params.app_version.clone());

    let Some(writable_dir) = params.writable_dir.as_deref() else {
        return (installed, baseline_version);
    };
    let (writable, writable_version) = read_directory(writable_dir, app_id, kind, layout);
    if writable.is_empty() {
        return (installed, baseline_version);
    }

    if !installed.is_empty()
        && baseline_version.is_some()
        && writable_version.is_some()
        && writable_version != baseline_version
    {
        tracing::info!(
            app_id,
            installed = ?baseline_version,
            writable = ?writable_version,
            "Working copy is from another version; merging"
        );
        return (merge(&writable, &installed).0, baseline_version);
    }

    let mut store = installed;
    store.overlay(writable);
    (store, baseline_version)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::empty("")]
    #[case::separator("tools/editor")]
    #[case::hidden(".editor")]
    fn invalid_app_ids_are_rejected(#[case] app_id: &str) {
        let result = ManagerParams::new(app_id).validate();

        assert!(matches!(result, Err(L10nError::InvalidArgument(_))));
    }

    #[rstest]
    #[case(0, 0, 0.0)]
    #[case(1, 4, 0.25)]
    #[case(3, 3, 1.0)]
    fn fraction_of_total(#[case] part: usize, #[case] whole: usize, #[case] expected: f64) {
        assert_eq!(fraction(part, whole), expected);
    }

    #[googletest::test]
    fn builder_sets_fields() {
        let params = ManagerParams::new("Editor")
            .with_app_name("Text Editor")
            .with_app_version("2.0")
            .with_installed_dir("/opt/editor/tm")
            .with_writable_dir("/home/me/.editor/tm");

        assert_that!(params.app_name.as_deref(), some(eq("Text Editor")));
        assert_that!(params.app_version.as_deref(), some(eq("2.0")));
        assert_that!(params.validate(), ok(anything()));
    }
}
