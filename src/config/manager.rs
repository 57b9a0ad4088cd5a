//! Current settings and the file they came from

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    L10nSettings,
    loader,
};

/// Holds validated settings and re-reads their file on request.
///
/// An invalid file or update never replaces the current settings.
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// Last valid settings
    current_settings: L10nSettings,

    /// Settings file of the loaded root
    source: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `.tm-l10n.json` from `root`, or defaults when there is no root or no file.
    ///
    /// # Errors
    /// - The file cannot be read or parsed
    /// - The settings fail validation
    pub fn load_settings(&mut self, root: Option<PathBuf>) -> Result<(), ConfigError> {
        let source = root.as_deref().map(loader::settings_path);
        let settings = match &source {
            Some(path) => loader::read_settings(path)?.unwrap_or_default(),
            None => L10nSettings::default(),
        };
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        tracing::debug!(source = ?source, ?settings, "Settings loaded");
        self.current_settings = settings;
        self.source = source;
        Ok(())
    }

    /// Re-reads the settings file of the loaded root.
    ///
    /// A file deleted since the last load resets to defaults. Returns whether
    /// the settings changed.
    ///
    /// # Errors
    /// Same as [`ConfigManager::load_settings`]; the current settings are kept.
    pub fn reload(&mut self) -> Result<bool, ConfigError> {
        let Some(path) = &self.source else {
            return Ok(false);
        };
        let settings = loader::read_settings(path)?.unwrap_or_default();
        self.update_settings(settings)
    }

    /// Replaces the settings after validating them. Returns whether they changed.
    ///
    /// # Errors
    /// Validation errors; the current settings are kept.
    pub fn update_settings(&mut self, new_settings: L10nSettings) -> Result<bool, ConfigError> {
        new_settings.validate().map_err(ConfigError::ValidationErrors)?;
        if new_settings == self.current_settings {
            return Ok(false);
        }

        tracing::info!(
            ui_language = %new_settings.ui_language,
            fallback = ?new_settings.fallback_languages,
            approved_only = new_settings.return_only_approved_strings,
            "Settings changed"
        );
        self.current_settings = new_settings;
        Ok(true)
    }

    #[must_use]
    pub const fn get_settings(&self) -> &L10nSettings {
        &self.current_settings
    }

    /// Settings file being tracked, if a root was loaded.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
