//! Database layer for relmap.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! explicit table descriptors, and the auto-migration routine that turns
//! those descriptors into tables, columns and indexes.
//!
//! # Design decisions
//!
//! - **Descriptors, not annotations**: a table is described by a
//!   [`TableDef`] value that lives next to, but separate from, the entity type
//!   it stores. [`migrate`] consumes a list of them.
//! - **Dependency-ordered migration**: tables referenced by a foreign key are
//!   created before the tables that reference them, whatever order the caller
//!   passes them in.
//! - **Statement logging**: pooled connections report every statement at
//!   `debug` and slow ones at `warn` (see [`trace`]).
//! - **`r2d2` connection pool**: each logical operation checks a connection
//!   out and returns it on drop, on every exit path.

mod migrations;
mod pool;
mod schema;
pub mod trace;

pub use migrations::{migrate, MigrationError, MigrationSummary};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use schema::{
    quote_ident, ColumnDef, ColumnType, ForeignKey, IndexDef, TableDef, BOOKKEEPING_COLUMNS,
};
