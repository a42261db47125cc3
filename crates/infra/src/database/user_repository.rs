//! SQLite-backed implementation of the user repository port.
//!
//! Writes go through a compare-and-swap protocol: the conditional UPDATE
//! carries the caller's version token in its WHERE clause, so advancing a
//! row is a single atomic storage operation. Zero affected rows is ambiguous
//! between "no such id" and "id exists at another version"; a follow-up read
//! disambiguates into the insert path or a version conflict. The insert path
//! itself is not atomic; a racing double-create is converted into a
//! constraint failure by the primary key on `users.id`.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::ToSql;
use tokio::task;
use tracing::info;
use userstore_common::storage::{SqliteConnection, StorageError};
use userstore_core::UserRepository as UserRepositoryPort;
use userstore_domain::{Result as DomainResult, User, UserStoreError};

use super::manager::DbManager;
use super::row::UserRow;
use crate::errors::InfraError;

const SELECT_USER_SQL: &str =
    "SELECT id, version, employee_id, job_profile FROM users WHERE id = ?1";

const UPDATE_USER_SQL: &str = "UPDATE users
     SET version = ?1, employee_id = ?2, job_profile = ?3
     WHERE id = ?4 AND version = ?5";

const INSERT_USER_SQL: &str =
    "INSERT INTO users (id, version, employee_id, job_profile) VALUES (?1, ?2, ?3, ?4)";

/// SQLite-backed implementation of `UserRepository`
pub struct SqliteUserRepository {
    db: Arc<DbManager>,
}

impl SqliteUserRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn fetch_by_id(conn: &SqliteConnection, id: &str) -> DomainResult<Option<User>> {
        let params: [&dyn ToSql; 1] = [&id];
        let result = conn.query_row(SELECT_USER_SQL, params.as_slice(), UserRow::from_row);

        match result {
            Ok(raw) => raw.decode().map(Some),
            Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
            Err(err) => Err(map_storage_error(err)),
        }
    }

    /// Re-read after a successful write so the caller observes the canonical
    /// stored state rather than its own input.
    fn fetch_after_write(conn: &SqliteConnection, id: &str) -> DomainResult<User> {
        Self::fetch_by_id(conn, id)?.ok_or_else(|| {
            UserStoreError::Internal(format!("user '{id}' missing immediately after write"))
        })
    }

    /// Conditional update: matches only a row holding the caller's version
    /// and advances it by exactly 1. Returns the affected-row count.
    fn conditional_update(conn: &SqliteConnection, user: &User) -> DomainResult<usize> {
        let version_after_update = (user.version + 1).to_string();
        let current_version = user.version.to_string();
        let employee_id = user.employee_id.map(|v| v.to_string());

        let params: [&dyn ToSql; 5] = [
            &version_after_update,
            &employee_id,
            &user.role,
            &user.id,
            &current_version,
        ];

        conn.execute(UPDATE_USER_SQL, params.as_slice()).map_err(map_storage_error)
    }

    fn insert_user(conn: &SqliteConnection, user: &User) -> DomainResult<()> {
        let version = user.version.to_string();
        let employee_id = user.employee_id.map(|v| v.to_string());

        let params: [&dyn ToSql; 4] = [&user.id, &version, &employee_id, &user.role];

        conn.execute(INSERT_USER_SQL, params.as_slice()).map(|_| ()).map_err(map_storage_error)
    }
}

#[async_trait]
impl UserRepositoryPort for SqliteUserRepository {
    async fn get_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<User>> {
            let conn = db.get_connection()?;
            Self::fetch_by_id(&conn, &id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_or_create(&self, user: User) -> DomainResult<User> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<User> {
            let conn = db.get_connection()?;

            let rows_updated = Self::conditional_update(&conn, &user)?;
            if rows_updated > 0 {
                info!(
                    user_id = %user.id,
                    version = user.version,
                    "user updated successfully on top of submitted version"
                );
                return Self::fetch_after_write(&conn, &user.id);
            }

            // Zero affected rows is ambiguous: the id may be absent, or
            // present at a different version. Read to disambiguate.
            match Self::fetch_by_id(&conn, &user.id)? {
                Some(current) => {
                    info!(
                        user_id = %user.id,
                        submitted_version = user.version,
                        current_version = current.version,
                        "rejecting update on stale version"
                    );
                    Err(UserStoreError::VersionConflict {
                        id: user.id.clone(),
                        submitted_version: user.version,
                        current_version: current.version,
                    })
                }
                None => {
                    info!(
                        user_id = %user.id,
                        version = user.version,
                        "user does not exist for update, inserting"
                    );
                    Self::insert_user(&conn, &user)?;
                    Self::fetch_after_write(&conn, &user.id)
                }
            }
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

fn map_storage_error(err: StorageError) -> UserStoreError {
    match err {
        StorageError::Rusqlite(sql) => InfraError::from(sql).into(),
        other => UserStoreError::Database(other.to_string()),
    }
}

fn map_join_error(err: task::JoinError) -> UserStoreError {
    UserStoreError::Internal(format!("Task join error: {err}"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn setup_test_db() -> (Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let manager = DbManager::new(&db_path, 5).expect("create db manager");
        manager.run_migrations().expect("run migrations");
        (Arc::new(manager), temp_dir)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_nonexistent_user_returns_none() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        let result = repo.get_by_id("non-existent-user-id").await.expect("lookup succeeds");
        assert!(result.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_and_get_user() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);
        let user = User::new("user-1", 12345);

        let saved = repo.update_or_create(user.clone()).await.expect("insert user");
        assert_eq!(saved.id, user.id);
        assert_eq!(saved.employee_id, user.employee_id);
        assert_eq!(saved.version, 0);
        assert_eq!(saved.role, None);

        let retrieved =
            repo.get_by_id(&user.id).await.expect("lookup succeeds").expect("user present");
        assert_eq!(retrieved, saved);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_assigns_role_and_advances_version() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        let inserted =
            repo.update_or_create(User::new("user-1", 12345)).await.expect("insert user");
        assert_eq!(inserted.role, None);

        let updated = repo
            .update_or_create(inserted.clone().with_role("new-role"))
            .await
            .expect("update user");
        assert_eq!(updated.version, inserted.version + 1);
        assert_eq!(updated.role.as_deref(), Some("new-role"));

        let retrieved =
            repo.get_by_id("user-1").await.expect("lookup succeeds").expect("user present");
        assert_eq!(retrieved.version, 1);
        assert_eq!(retrieved.role.as_deref(), Some("new-role"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn version_increments_by_one_on_every_update() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        let mut current =
            repo.update_or_create(User::new("user-1", 12345)).await.expect("insert user");
        assert_eq!(current.version, 0);

        for expected_version in 1..=3 {
            current = repo
                .update_or_create(current.clone().with_role(format!("role-{expected_version}")))
                .await
                .expect("update user");
            assert_eq!(current.version, expected_version);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_version_is_rejected_with_conflict() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        let inserted =
            repo.update_or_create(User::new("user-1", 12345)).await.expect("insert user");
        repo.update_or_create(inserted.clone().with_role("new-role"))
            .await
            .expect("first update succeeds");

        // Same version token again: the store has moved on to version 1.
        let result = repo.update_or_create(inserted.with_role("new-role-2")).await;

        match result {
            Err(UserStoreError::VersionConflict { id, submitted_version, current_version }) => {
                assert_eq!(id, "user-1");
                assert_eq!(submitted_version, 0);
                assert_eq!(current_version, 1);
            }
            other => panic!("expected version conflict, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflict_message_is_deterministic() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        let inserted =
            repo.update_or_create(User::new("user-1", 12345)).await.expect("insert user");
        repo.update_or_create(inserted.clone().with_role("new-role"))
            .await
            .expect("first update succeeds");

        let err = repo
            .update_or_create(inserted.with_role("new-role-2"))
            .await
            .expect_err("stale update must fail");

        assert_eq!(
            err.to_string(),
            "The version of user 'user-1' provided for update is '0'. \
             But the latest version of user 'user-1' is '1'. \
             Please update on top of this version."
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retry_on_latest_version_succeeds_after_conflict() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        // insert {id: user-1, employeeId: 12345} -> version 0, no role
        let inserted =
            repo.update_or_create(User::new("user-1", 12345)).await.expect("insert user");

        // update on version 0 with a role -> version 1
        let first_update = repo
            .update_or_create(inserted.clone().with_role("new-role"))
            .await
            .expect("first update succeeds");
        assert_eq!(first_update.version, 1);

        // stale update on version 0 -> conflict naming versions 0 and 1
        let stale = inserted.with_role("new-role-2");
        let err = repo.update_or_create(stale.clone()).await.expect_err("stale update must fail");
        assert!(err.is_conflict());

        // retry the same logical change on the latest version -> version 2
        let retried = repo
            .update_or_create(stale.with_version(first_update.version))
            .await
            .expect("retry on latest version succeeds");
        assert_eq!(retried.version, 2);
        assert_eq!(retried.role.as_deref(), Some("new-role-2"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_keeps_caller_version_as_given() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        // The port does not force version 0 on creation; conventional
        // callers pass 0, but the caller's token is stored as given.
        let user = User::new("user-7", 777).with_version(5);
        let saved = repo.update_or_create(user).await.expect("insert user");
        assert_eq!(saved.version, 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_clears_optionals_when_absent() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(db);

        let inserted = repo
            .update_or_create(User::new("user-1", 12345).with_role("ops"))
            .await
            .expect("insert user");
        assert_eq!(inserted.employee_id, Some(12345));

        let cleared = repo
            .update_or_create(User {
                id: inserted.id.clone(),
                version: inserted.version,
                employee_id: None,
                role: None,
            })
            .await
            .expect("update user");
        assert_eq!(cleared.employee_id, None);
        assert_eq!(cleared.role, None);

        let retrieved =
            repo.get_by_id("user-1").await.expect("lookup succeeds").expect("user present");
        assert_eq!(retrieved.employee_id, None);
        assert_eq!(retrieved.role, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_row_surfaces_corrupt_record() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(Arc::clone(&db));

        // Write a row with an unparsable version behind the repository's back.
        let conn = db.get_connection().expect("connection acquired");
        let no_value: Option<String> = None;
        let params: [&dyn ToSql; 4] = [&"user-bad", &"not-a-number", &no_value, &no_value];
        conn.execute(
            "INSERT INTO users (id, version, employee_id, job_profile) VALUES (?1, ?2, ?3, ?4)",
            params.as_slice(),
        )
        .expect("raw insert");
        drop(conn);

        match repo.get_by_id("user-bad").await {
            Err(UserStoreError::CorruptRecord(msg)) => {
                assert!(msg.contains("not-a-number"));
                assert!(msg.contains("user-bad"));
            }
            other => panic!("expected corrupt record, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_insert_surfaces_constraint_violation() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteUserRepository::new(Arc::clone(&db));

        repo.update_or_create(User::new("user-1", 12345)).await.expect("insert user");

        // Drive the insert helper directly to simulate the loser of a
        // create/create race: both observed absence, one insert landed first.
        let conn = db.get_connection().expect("connection acquired");
        let err = SqliteUserRepository::insert_user(&conn, &User::new("user-1", 999))
            .expect_err("duplicate insert must fail");

        match err {
            UserStoreError::Database(msg) => assert_eq!(msg, "unique constraint violation"),
            other => panic!("expected database error, got {:?}", other),
        }
    }
}
