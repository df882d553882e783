//! Auto-migration from [`TableDef`] descriptors.
//!
//! [`migrate`] brings the database up to the shape described by a list of
//! table descriptors. It only ever adds: missing tables are created, missing
//! columns are appended to existing tables, and indexes are ensured. Nothing
//! is dropped or rewritten, and there is no version history.
//!
//! The whole run happens inside one transaction. If any step fails, every
//! change made by the run is rolled back.

use std::collections::HashSet;

use rusqlite::Connection;
use thiserror::Error;

use crate::schema::{quote_ident, TableDef};

/// Errors that can occur during migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement for the named table failed.
    #[error("migration of table '{name}' failed: {source}")]
    ExecutionFailed {
        /// The table being migrated.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to inspect the existing schema.
    #[error("failed to inspect database schema: {0}")]
    StateQuery(rusqlite::Error),

    /// A foreign key points at a table that is neither being migrated nor
    /// already present in the database.
    #[error("table '{table}' references unknown table '{references}'")]
    UnknownReference { table: String, references: String },

    /// The foreign keys of the given tables form a cycle.
    #[error("foreign key cycle between tables: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    /// A column is missing from an existing table and cannot be appended
    /// because it is `NOT NULL` without a constant default.
    #[error("cannot add column '{column}' to existing table '{table}': NOT NULL without a constant default")]
    UnaddableColumn { table: String, column: String },
}

/// What a migration run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Tables created by this run, in creation order.
    pub tables_created: Vec<String>,
    /// `(table, column)` pairs appended to pre-existing tables.
    pub columns_added: Vec<(String, String)>,
    /// Number of `CREATE INDEX IF NOT EXISTS` statements executed.
    pub indexes_ensured: usize,
}

impl MigrationSummary {
    /// Returns `true` if the run created no tables and added no columns.
    pub fn is_noop(&self) -> bool {
        self.tables_created.is_empty() && self.columns_added.is_empty()
    }
}

/// Brings the database up to date with `tables`.
///
/// Tables are processed in dependency order: a table referenced by another
/// table's foreign key is always handled first, whatever order `tables` is in.
///
/// # Errors
///
/// Returns `MigrationError` if the descriptors reference unknown tables or
/// form a cycle, if a missing column cannot be added, or if any statement
/// fails. Nothing is left applied in that case.
pub fn migrate(conn: &Connection, tables: &[&TableDef]) -> Result<MigrationSummary, MigrationError> {
    let existing = existing_tables(conn)?;
    let ordered = creation_order(tables, &existing)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(MigrationError::StateQuery)?;

    let mut summary = MigrationSummary::default();

    for table in ordered {
        let fail = |source| MigrationError::ExecutionFailed {
            name: table.name.to_string(),
            source,
        };

        if existing.contains(table.name) {
            let present = existing_columns(&tx, table.name)?;
            for column in table.all_columns() {
                if present.contains(column.name) {
                    continue;
                }
                if !column.can_be_added_later() {
                    return Err(MigrationError::UnaddableColumn {
                        table: table.name.to_string(),
                        column: column.name.to_string(),
                    });
                }
                tracing::info!(table = table.name, column = column.name, "adding column");
                tx.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quote_ident(table.name),
                    column.definition_sql()
                ))
                .map_err(fail)?;
                summary
                    .columns_added
                    .push((table.name.to_string(), column.name.to_string()));
            }
        } else {
            tracing::info!(table = table.name, "creating table");
            tx.execute_batch(&table.create_table_sql()).map_err(fail)?;
            summary.tables_created.push(table.name.to_string());
        }

        for index in table.indexes {
            tracing::debug!(table = table.name, index = index.name, "ensuring index");
            tx.execute_batch(&index.create_sql(table.name))
                .map_err(fail)?;
            summary.indexes_ensured += 1;
        }
    }

    tx.commit().map_err(MigrationError::StateQuery)?;

    Ok(summary)
}

/// Sorts `tables` so that every table comes after the tables it references.
///
/// Input order is kept among tables that do not depend on each other.
/// References to tables that already exist in the database are satisfied.
fn creation_order<'a>(
    tables: &[&'a TableDef],
    existing: &HashSet<String>,
) -> Result<Vec<&'a TableDef>, MigrationError> {
    let migrating: HashSet<&str> = tables.iter().map(|t| t.name).collect();

    for table in tables {
        for dep in table.depends_on() {
            if !migrating.contains(dep) && !existing.contains(dep) {
                return Err(MigrationError::UnknownReference {
                    table: table.name.to_string(),
                    references: dep.to_string(),
                });
            }
        }
    }

    let mut pending: Vec<&'a TableDef> = tables.to_vec();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending.iter().position(|table| {
            table
                .depends_on()
                .iter()
                .all(|dep| placed.contains(dep) || !migrating.contains(dep))
        });

        match ready {
            Some(pos) => {
                let table = pending.remove(pos);
                placed.insert(table.name);
                ordered.push(table);
            }
            None => {
                return Err(MigrationError::DependencyCycle(
                    pending.iter().map(|t| t.name.to_string()).collect(),
                ))
            }
        }
    }

    Ok(ordered)
}

fn existing_tables(conn: &Connection) -> Result<HashSet<String>, MigrationError> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(MigrationError::StateQuery)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(MigrationError::StateQuery)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(MigrationError::StateQuery)?;
    Ok(names)
}

fn existing_columns(conn: &Connection, table: &str) -> Result<HashSet<String>, MigrationError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
        .map_err(MigrationError::StateQuery)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))
        .map_err(MigrationError::StateQuery)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(MigrationError::StateQuery)?;
    Ok(names)
}
