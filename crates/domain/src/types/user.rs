//! User entity
//!
//! The single entity persisted by this system. `version` is the
//! optimistic-lock token: it starts at 0 on the first successful insert and
//! advances by exactly 1 on each successful update.

use serde::{Deserialize, Serialize};

/// A user record as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Caller-assigned identifier, immutable after creation
    pub id: String,
    /// Optimistic-lock token, non-negative; counts successful writes
    /// (the initial insert is write 0)
    pub version: i64,
    /// Linked employee number; `None` means no employee linkage
    pub employee_id: Option<i64>,
    /// Assigned role; `None` means no assigned role
    pub role: Option<String>,
}

impl User {
    /// Conventional initial state for a new user: version 0, the given
    /// employee id, no role.
    pub fn new(id: impl Into<String>, employee_id: i64) -> Self {
        Self { id: id.into(), version: 0, employee_id: Some(employee_id), role: None }
    }

    /// Copy of this user with the role replaced
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Copy of this user with the version token replaced
    ///
    /// Used when retrying a rejected update on top of the latest stored
    /// version.
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }
}
