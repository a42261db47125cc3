//! SQLite connection pool
//!
//! Provides r2d2-based connection pooling for SQLite databases with
//! per-connection pragmas applied at initialisation.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, warn};

use super::config::SqlitePoolConfig;
use super::connection::SqliteConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};

/// SQLite connection pool
///
/// Manages a pool of SQLite connections using r2d2. Each connection gets the
/// configured pragmas (WAL, synchronous mode, foreign keys, busy timeout)
/// applied when it is created.
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
}

impl SqlitePool {
    /// Create a new SQLite connection pool
    ///
    /// # Errors
    /// Returns an error if:
    /// - The database file can't be created or opened
    /// - Pool creation fails
    pub fn new(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        info!(db_path = %path.display(), pool_size = config.max_size, "creating sqlite connection pool");

        // Create connection manager with initialization callback
        let pool_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        // Build r2d2 pool
        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("failed to create connection pool: {}", e);
                StorageError::Connection(format!("Failed to create pool: {}", e))
            })?;

        // Acquire a test connection so a broken database path fails fast
        {
            let _conn = pool.get().map_err(|e| {
                warn!("failed to get test connection: {}", e);
                StorageError::Connection(format!("Failed to get test connection: {}", e))
            })?;
            debug!("test connection acquired");
        }

        Ok(Self { pool, config })
    }

    /// Acquire a connection from the pool
    pub fn get(&self) -> StorageResult<SqliteConnection> {
        match self.pool.get() {
            Ok(conn) => Ok(SqliteConnection::new(conn)),
            Err(err) => {
                // r2d2 reports both exhaustion and connect failures through
                // the same timeout error; report it as a timeout with the
                // configured wait.
                warn!("connection acquisition failed: {}", err);
                Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
            }
        }
    }

    /// Maximum number of connections this pool hands out
    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }

    /// Perform a health check against the pool
    pub fn health_check(&self) -> StorageResult<()> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", &[], |row| row.get::<_, i32>(0))?;
        Ok(())
    }
}
