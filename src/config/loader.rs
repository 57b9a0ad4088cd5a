//! Reading `.tm-l10n.json`

use std::io::ErrorKind;
use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    L10nSettings,
};

/// Settings file looked up in a configuration root
pub const CONFIG_FILE_NAME: &str = ".tm-l10n.json";

/// Location of the settings file under `root`.
pub(super) fn settings_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Parses the settings file at `path`.
///
/// Returns `Ok(None)` when the file does not exist. Validation is left to the caller.
///
/// # Errors
/// - The file exists but cannot be read
/// - The content is not valid settings JSON
pub(super) fn read_settings(path: &Path) -> Result<Option<L10nSettings>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No settings file");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let settings: L10nSettings = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), ?settings, "Read settings file");
    Ok(Some(settings))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    fn reads_partial_settings_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = settings_path(temp_dir.path());
        fs::write(&path, r#"{"uiLanguage": "ja"}"#).unwrap();

        let settings = read_settings(&path).unwrap().unwrap();

        assert_that!(settings.ui_language.as_str(), eq("ja"));
        assert_that!(settings.fallback_languages, is_empty());
    }

    #[rstest]
    fn missing_file_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = read_settings(&settings_path(temp_dir.path()));

        assert_that!(result, ok(none()));
    }

    #[rstest]
    fn invalid_json_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = settings_path(temp_dir.path());
        fs::write(&path, "invalid json").unwrap();

        assert!(matches!(read_settings(&path), Err(ConfigError::ParseError(_))));
    }

    #[rstest]
    fn directory_in_place_of_file_is_an_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = settings_path(temp_dir.path());
        fs::create_dir(&path).unwrap();

        assert!(matches!(read_settings(&path), Err(ConfigError::IoError(_))));
    }
}
