//! Storage primitives for the SQLite backend
//!
//! This module provides the generic storage infrastructure shared by the
//! adapter crates: connection pooling, per-connection pragmas and the
//! storage error type.

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod pragmas;

// Re-export commonly used types
pub use config::SqlitePoolConfig;
pub use connection::SqliteConnection;
pub use error::{StorageError, StorageResult};
pub use pool::SqlitePool;
pub use pragmas::apply_connection_pragmas;
