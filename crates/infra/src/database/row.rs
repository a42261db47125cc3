//! Row decoding for user records
//!
//! The store keeps numeric user fields as text. [`UserRow`] captures the raw
//! column values and [`UserRow::decode`] turns them into a [`User`],
//! enforcing mandatory-field presence. A malformed row is a
//! [`UserStoreError::CorruptRecord`] fault, distinct from connection-level
//! failures, so callers can tell bad data from a bad connection.

use rusqlite::Row;
use userstore_domain::{Result, User, UserStoreError};

/// Raw user row as read from storage, before validation.
#[derive(Debug, Clone, Default)]
pub struct UserRow {
    pub id: Option<String>,
    pub version: Option<String>,
    pub employee_id: Option<String>,
    pub job_profile: Option<String>,
}

impl UserRow {
    /// Map a rusqlite row (selected as `id, version, employee_id,
    /// job_profile`) into its raw form.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            version: row.get(1)?,
            employee_id: row.get(2)?,
            job_profile: row.get(3)?,
        })
    }

    /// Decode the raw row into a [`User`].
    ///
    /// `id` and `version` are mandatory; `employee_id` and `job_profile`
    /// are optional and map to `None` when absent. No side effects.
    pub fn decode(self) -> Result<User> {
        let id = self
            .id
            .ok_or_else(|| UserStoreError::CorruptRecord("id is missing for user in DB".into()))?;

        let raw_version = self.version.ok_or_else(|| {
            UserStoreError::CorruptRecord(format!("version is missing for user '{id}' in DB"))
        })?;
        let version: i64 = raw_version.parse().map_err(|_| {
            UserStoreError::CorruptRecord(format!(
                "version '{raw_version}' for user '{id}' is not an integer"
            ))
        })?;
        if version < 0 {
            return Err(UserStoreError::CorruptRecord(format!(
                "version '{version}' for user '{id}' is negative"
            )));
        }

        let employee_id = match self.employee_id {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                UserStoreError::CorruptRecord(format!(
                    "employee_id '{raw}' for user '{id}' is not an integer"
                ))
            })?),
            None => None,
        };

        Ok(User { id, version, employee_id, role: self.job_profile })
    }
}
