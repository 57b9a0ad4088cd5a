use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

/// Errors raised while reading or writing a translation memory file
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file does not exist; callers treat this as "no translations yet"
    #[error("Translation memory file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file exists but its content is not a valid document
    #[error("Malformed translation memory{}: {message}", describe_path(.path.as_deref()))]
    Format { path: Option<PathBuf>, message: String },
    /// Serializing a document failed
    #[error("Failed to encode translation memory: {0}")]
    Encode(String),
    /// Any other filesystem failure
    #[error("Failed to access translation memory file: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format { path: None, message: message.into() }
    }

    /// Attaches the offending file to a format error.
    #[must_use]
    pub fn with_path(self, file: &Path) -> Self {
        match self {
            Self::Format { message, .. } => {
                Self::Format { path: Some(file.to_path_buf()), message }
            }
            other => other,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// ` '<path>'` suffix for messages, empty without a path.
fn describe_path(path: Option<&Path>) -> String {
    path.map_or_else(String::new, |p| format!(" '{}'", p.display()))
}
