//! Format-agnostic translation data
/// Translation entry types
mod entry;
/// Identifier → entry store
mod entry_store;

pub use entry::{
    ENGLISH,
    Translation,
    TranslationEntry,
};
pub use entry_store::{
    EntryStore,
    HarvestedString,
};
