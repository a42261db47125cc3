//! Conversions from external infrastructure errors into domain errors.

use rusqlite::Error as SqlError;
use userstore_domain::UserStoreError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub UserStoreError);

impl From<InfraError> for UserStoreError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<UserStoreError> for InfraError {
    fn from(value: UserStoreError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoUserStoreError {
    fn into_userstore(self) -> UserStoreError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → UserStoreError */
/* -------------------------------------------------------------------------- */

impl IntoUserStoreError for SqlError {
    fn into_userstore(self) -> UserStoreError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        UserStoreError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        UserStoreError::Database("database is locked".into())
                    }
                    // 1555 = SQLITE_CONSTRAINT_PRIMARYKEY, 2067 = SQLITE_CONSTRAINT_UNIQUE
                    (ErrorCode::ConstraintViolation, 1555 | 2067) => {
                        UserStoreError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        UserStoreError::Database("foreign key constraint violation".into())
                    }
                    _ => UserStoreError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                UserStoreError::Database("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                UserStoreError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                UserStoreError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                UserStoreError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                UserStoreError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => UserStoreError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => UserStoreError::Database("invalid SQL query".into()),
            other => UserStoreError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_userstore())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
