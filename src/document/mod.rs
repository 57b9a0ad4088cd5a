//! Translation memory documents
//!
//! A [`TmDocument`] is either TMX or XLIFF. The rest of the crate only deals
//! with [`EntryStore`]s; documents are the decode/encode boundary.
/// Document errors
mod error;
/// File placement on disk
mod layout;
/// TMX format
mod tmx;
/// XLIFF format
mod xliff;
/// Shared `quick_xml` helpers
mod xml;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{
    Deserialize,
    Serialize,
};

pub use error::DocumentError;
pub use layout::{
    FileLayout,
    is_language_code,
};
pub use tmx::{
    TmxDocument,
    TmxUnit,
};
pub use xliff::{
    XliffDocument,
    XliffUnit,
};

use crate::error::L10nError;
use crate::store::EntryStore;

/// Backing file format of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackingKind {
    /// TMX: no approval state, `x-appversion` header property
    #[default]
    Tmx,
    /// XLIFF 1.2: per-unit approval, `product-version` attribute
    Xliff,
}

impl BackingKind {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Tmx => "tmx",
            Self::Xliff => "xlf",
        }
    }

    #[must_use]
    pub const fn stores_approval(self) -> bool {
        matches!(self, Self::Xliff)
    }
}

impl fmt::Display for BackingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tmx => f.write_str("tmx"),
            Self::Xliff => f.write_str("xliff"),
        }
    }
}

impl FromStr for BackingKind {
    type Err = L10nError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tmx" => Ok(Self::Tmx),
            "xliff" | "xlf" => Ok(Self::Xliff),
            other => Err(L10nError::InvalidArgument(format!("unknown backing kind '{other}'"))),
        }
    }
}

/// A decoded translation memory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmDocument {
    Tmx(TmxDocument),
    Xliff(XliffDocument),
}

impl TmDocument {
    pub fn decode(kind: BackingKind, bytes: &[u8]) -> Result<Self, DocumentError> {
        match kind {
            BackingKind::Tmx => TmxDocument::decode(bytes).map(Self::Tmx),
            BackingKind::Xliff => XliffDocument::decode(bytes).map(Self::Xliff),
        }
    }

    /// Reads and decodes a file. A missing file is [`DocumentError::NotFound`].
    pub fn read(kind: BackingKind, path: &Path) -> Result<Self, DocumentError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        Self::decode(kind, &bytes).map_err(|e| e.with_path(path))
    }

    pub fn encode(&self) -> Result<Vec<u8>, DocumentError> {
        match self {
            Self::Tmx(document) => document.encode(),
            Self::Xliff(document) => document.encode(),
        }
    }

    /// Encodes and writes the document, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), DocumentError> {
        let bytes = self.encode()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        tracing::debug!(path = %path.display(), "Wrote translation memory");
        Ok(())
    }

    #[must_use]
    pub const fn kind(&self) -> BackingKind {
        match self {
            Self::Tmx(_) => BackingKind::Tmx,
            Self::Xliff(_) => BackingKind::Xliff,
        }
    }

    /// Application version recorded when the file was written.
    #[must_use]
    pub fn app_version(&self) -> Option<&str> {
        match self {
            Self::Tmx(document) => document.app_version.as_deref(),
            Self::Xliff(document) => document.app_version.as_deref(),
        }
    }

    #[must_use]
    pub fn to_entry_store(&self) -> EntryStore {
        match self {
            Self::Tmx(document) => document.to_entry_store(),
            Self::Xliff(document) => document.to_entry_store(),
        }
    }

    /// Builds the file for one (application, language) pair.
    #[must_use]
    pub fn from_entry_store(
        kind: BackingKind,
        store: &EntryStore,
        app_id: &str,
        language: &str,
        app_version: Option<&str>,
    ) -> Self {
        match kind {
            BackingKind::Tmx => Self::Tmx(TmxDocument::from_entry_store(store, language, app_version)),
            BackingKind::Xliff => {
                Self::Xliff(XliffDocument::from_entry_store(store, app_id, language, app_version))
            }
        }
    }
}
