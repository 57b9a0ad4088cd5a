use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;

/// Errors surfaced by the registry and its managers.
///
/// Lookup misses are not errors; they resolve to fallback text.
#[derive(Error, Debug)]
pub enum L10nError {
    /// No manager was ever created for this application id
    #[error("No localization manager exists for application '{0}'")]
    UnknownApplicationId(String),
    /// The manager for this application id has been disposed
    #[error("Localization manager for application '{0}' has been disposed")]
    UseAfterDispose(String),
    /// A caller passed a value outside the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
