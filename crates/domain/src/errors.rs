//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Userstore
///
/// `NotFound` is deliberately absent: a lookup that matches no row completes
/// with an empty result, not an error.
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum UserStoreError {
    /// Connectivity, transport or constraint-violation failure from the
    /// underlying store. Surfaced as-is, never retried internally.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A row exists but a mandatory field is missing or unparsable. Fatal;
    /// never silently defaulted.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The caller's version token no longer matches the stored row. The
    /// caller is expected to re-read and retry on top of the latest version.
    #[error(
        "The version of user '{id}' provided for update is '{submitted_version}'. \
         But the latest version of user '{id}' is '{current_version}'. \
         Please update on top of this version."
    )]
    VersionConflict {
        id: String,
        submitted_version: i64,
        current_version: i64,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Userstore operations
pub type Result<T> = std::result::Result<T, UserStoreError>;

impl UserStoreError {
    /// Whether the caller can recover by re-reading and retrying with the
    /// latest version token. Only version conflicts qualify; storage and
    /// decode faults must surface unchanged.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
