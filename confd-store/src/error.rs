//! Store error types.

use crate::store::PropertyType;
use thiserror::Error;

/// Errors from the property store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("changing type of key '{key}' from {stored} to {requested} not allowed")]
    TypeChange {
        key: String,
        stored: PropertyType,
        requested: PropertyType,
    },

    #[error("key '{0}' has child keys")]
    HasChildren(String),

    #[error("store consistency violation: {0}")]
    Inconsistent(String),

    #[error("unsupported schema version {found} (newest supported {supported})")]
    SchemaVersion { found: u32, supported: u32 },

    #[error("invalid key name")]
    InvalidKey,
}

impl StoreError {
    /// Returns whether the error denies the write without implying a store
    /// fault (the stored value is untouched and retrying is pointless).
    pub fn is_type_change(&self) -> bool {
        matches!(self, StoreError::TypeChange { .. })
    }
}
