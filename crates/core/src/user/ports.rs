//! Port interfaces for user persistence
//!
//! These traits define the boundary between core business logic and
//! infrastructure implementations for user records.

use async_trait::async_trait;
use userstore_domain::{Result, User};

/// Trait for user persistence and retrieval
///
/// Writes go through [`update_or_create`](UserRepository::update_or_create),
/// which enforces optimistic concurrency: the caller's `version` must match
/// the stored row for an update to apply, and a mismatch surfaces as
/// [`UserStoreError::VersionConflict`](userstore_domain::UserStoreError).
/// Implementations perform no internal retries.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user by ID
    ///
    /// Completes with `Ok(None)` when no row matches; an existing but
    /// malformed row is a `CorruptRecord` fault, not an empty result.
    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Update an existing user or create a new one
    ///
    /// Applies the conditional-update protocol: a matching `id` + `version`
    /// row is advanced to `version + 1`; an absent `id` is inserted with the
    /// caller's version as given; a live row with a different version is a
    /// version conflict. On success, returns the freshly stored record so
    /// the caller observes the canonical state (in particular the new
    /// version token).
    async fn update_or_create(&self, user: User) -> Result<User>;
}
