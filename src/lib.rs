//! tm-l10n
//!
//! Translation-memory backed localization: per-application string managers,
//! fallback-chain lookups, and TMX / XLIFF persistence with version merging.

pub mod config;
pub mod document;
pub mod error;
pub mod merge;
pub mod registry;
pub mod resolver;
pub mod store;

/// Shared test helpers
#[cfg(test)]
mod test_utils;

pub use error::L10nError;
pub use registry::{
    LocalizationEvent,
    Manager,
    ManagerParams,
    ManagerRegistry,
};
