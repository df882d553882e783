//! Connection pool creation and configuration.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

use crate::trace::{install_statement_logger, set_slow_query_threshold, DEFAULT_SLOW_QUERY_MS};

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,

    /// How long checking a connection out of the pool may wait, in
    /// milliseconds, before the operation fails.
    pub connection_timeout_ms: u64,

    /// Statements running longer than this, in milliseconds, are logged at
    /// `warn` level. Applies process-wide (see [`crate::trace`]).
    pub slow_query_ms: u64,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
            connection_timeout_ms: 30_000,
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No database path was given.
    #[error("database path is empty")]
    EmptyPath,

    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Creates a new SQLite connection pool with WAL mode and foreign keys enabled.
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file. Use `:memory:` for an
///   in-memory database. Every pooled connection to `:memory:` opens its own
///   private database, so only single-connection use makes sense there.
///
/// # Errors
///
/// Returns `PoolError::EmptyPath` for a blank path and
/// `PoolError::PoolInit` if the connection pool cannot be created (for
/// example, the file cannot be opened).
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    if db_path.trim().is_empty() {
        return Err(PoolError::EmptyPath);
    }

    set_slow_query_threshold(Duration::from_millis(settings.slow_query_ms));

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            install_statement_logger(conn);
            // Busy timeout first: pooled connections are opened concurrently
            // and switching to WAL needs a lock.
            conn.execute_batch(&format!(
                "PRAGMA busy_timeout = {};
                 PRAGMA foreign_keys = ON;",
                settings.busy_timeout_ms
            ))?;
            // In-memory databases report "memory", which is acceptable.
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!(
                        "failed to set WAL journal mode, got: {}",
                        journal_mode
                    )),
                ));
            }
            Ok(())
        });

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .connection_timeout(Duration::from_millis(settings.connection_timeout_ms))
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        max_size = settings.pool_max_size,
        "database pool ready"
    );

    Ok(pool)
}
