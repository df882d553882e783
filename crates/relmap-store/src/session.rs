//! The session object: pool ownership, scoped connections and transactions.
//!
//! A [`Session`] is constructed explicitly at startup, passed to whatever
//! needs the database, and torn down with [`Session::close`]. Every operation
//! checks a connection out of the pool for its own duration; the connection
//! goes back to the pool when the guard drops, including on error paths.

use relmap_db::{create_pool, migrate, DbPool, DbRuntimeSettings, MigrationSummary};
use rusqlite::{Connection, TransactionBehavior};

use crate::error::StoreError;
use crate::schema::SCHEMA;

/// Handle to the application database. Cloning shares the pool.
#[derive(Clone)]
pub struct Session {
    pool: DbPool,
}

impl Session {
    /// Opens a pool on `db_path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PoolInit` if the path is blank or the database
    /// cannot be opened.
    pub fn open(db_path: &str, settings: DbRuntimeSettings) -> Result<Self, StoreError> {
        let pool = create_pool(db_path, settings)?;
        tracing::info!(path = db_path, "session opened");
        Ok(Self { pool })
    }

    /// Wraps a pool built elsewhere. The session shares it with any other
    /// holder of the pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Creates or extends the `users`, `notes` and `credit_cards` tables.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Migration` if the schema cannot be applied; no
    /// part of the run is kept in that case.
    pub fn migrate(&self) -> Result<MigrationSummary, StoreError> {
        self.with_conn(|conn| {
            let summary = migrate(conn, &SCHEMA)?;
            if summary.is_noop() {
                tracing::debug!("schema already up to date");
            } else {
                tracing::info!(
                    tables_created = summary.tables_created.len(),
                    columns_added = summary.columns_added.len(),
                    "applied schema migration"
                );
            }
            Ok(summary)
        })
    }

    /// Runs `f` with a pooled connection held for its duration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Pool` if no connection becomes available within
    /// the configured timeout, or whatever `f` returns.
    pub fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.pool.get()?;
        f(&*conn)
    }

    /// Runs `f` as one atomic unit of work on a single connection.
    ///
    /// The transaction commits if `f` returns `Ok` and rolls back if it
    /// returns `Err`; the error is handed back unchanged. Nothing `f` writes
    /// is visible to other connections before the commit.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a `StoreError` (converted into
    /// `E`) if the transaction cannot be started or committed.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let mut conn = self.pool.get().map_err(StoreError::from)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        match f(&*tx) {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                tracing::debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, "transaction rollback failed");
                } else {
                    tracing::warn!("unit of work failed, transaction rolled back");
                }
                Err(err)
            }
        }
    }

    /// Tears the session down, closing idle pooled connections.
    pub fn close(self) {
        let state = self.pool.state();
        tracing::info!(
            connections = state.connections,
            idle = state.idle_connections,
            "session closed"
        );
        drop(self.pool);
    }
}

/// An open savepoint on a shared connection.
///
/// rusqlite's own `Savepoint` needs `&mut Connection`, which store functions
/// do not have. Dropping the guard without a successful [`release`] rolls
/// back to the savepoint and releases it, so no transaction is left open on
/// a connection that goes back to the pool.
///
/// [`release`]: SavepointGuard::release
struct SavepointGuard<'c> {
    conn: &'c Connection,
    name: &'c str,
    released: bool,
}

impl<'c> SavepointGuard<'c> {
    fn begin(conn: &'c Connection, name: &'c str) -> Result<Self, StoreError> {
        conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        Ok(Self {
            conn,
            name,
            released: false,
        })
    }

    fn release(mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!("RELEASE {}", self.name))?;
        self.released = true;
        Ok(())
    }
}

impl Drop for SavepointGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let name = self.name;
        if let Err(err) = self
            .conn
            .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))
        {
            tracing::error!(savepoint = name, error = %err, "savepoint rollback failed");
        }
    }
}

/// Runs `f` under a named SQLite savepoint.
///
/// Outside a transaction the savepoint opens one and `RELEASE` commits it;
/// inside a transaction it nests. If `f` fails, or the release itself fails
/// (for example on a deferred constraint), everything since the savepoint is
/// undone.
pub(crate) fn with_savepoint<T, F>(conn: &Connection, name: &str, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Connection) -> Result<T, StoreError>,
{
    let savepoint = SavepointGuard::begin(conn, name)?;
    let value = f(conn)?;
    savepoint.release()?;
    Ok(value)
}
