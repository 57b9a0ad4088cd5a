//! Mapping from (application id, language) to a file on disk

use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};

use super::BackingKind;

/// How translation memory files are arranged inside a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileLayout {
    /// `<dir>/<app_id>.<lang>.<ext>`
    #[default]
    FilePerLanguage,
    /// `<dir>/<lang>/<app_id>.<ext>`
    DirectoryPerLanguage,
}

impl FileLayout {
    #[must_use]
    pub fn file_path(self, dir: &Path, app_id: &str, language: &str, kind: BackingKind) -> PathBuf {
        let extension = kind.extension();
        match self {
            Self::FilePerLanguage => dir.join(format!("{app_id}.{language}.{extension}")),
            Self::DirectoryPerLanguage => dir.join(language).join(format!("{app_id}.{extension}")),
        }
    }

    /// Lists the languages that have a file for `app_id`, sorted by language code.
    ///
    /// A missing or unreadable directory yields an empty list.
    #[must_use]
    pub fn discover(self, dir: &Path, app_id: &str, kind: BackingKind) -> Vec<(String, PathBuf)> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), "Skipping translation directory: {e}");
                return Vec::new();
            }
        };

        let prefix = format!("{app_id}.");
        let suffix = format!(".{}", kind.extension());
        let mut found: Vec<(String, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                match self {
                    Self::FilePerLanguage => {
                        let language = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
                        (path.is_file() && is_language_code(language))
                            .then(|| (language.to_string(), path))
                    }
                    Self::DirectoryPerLanguage => {
                        let file = self.file_path(dir, app_id, &name, kind);
                        (path.is_dir() && is_language_code(&name) && file.is_file())
                            .then_some((name, file))
                    }
                }
            })
            .collect();
        found.sort();
        found
    }
}

/// Loose BCP 47 shape check: alphanumeric subtags joined by `-` or `_`.
#[must_use]
pub fn is_language_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .split(['-', '_'])
            .all(|part| !part.is_empty() && part.len() <= 8 && part.chars().all(|c| c.is_ascii_alphanumeric()))
}
