//! Raw SQL escape hatches.
//!
//! Both functions take positional parameters (`?1`, `?2`, ...) through
//! rusqlite's [`Params`]; values are bound, never formatted into the SQL.
//! Only the first statement of `sql` is compiled: trailing statements are
//! rejected by the driver rather than executed.

use rusqlite::{Connection, Params, Row};

use crate::error::StoreError;

/// Runs a read-only statement and projects each row through `map_row`.
///
/// Columns that may be absent (for example the right side of a `LEFT JOIN`)
/// should be read as `Option<T>` by the caller; they come back as `None`.
///
/// # Errors
///
/// Returns `StoreError::NotReadOnly` if the statement would modify the
/// database, or `StoreError::Database` on SQL failure.
pub fn raw_query<T, P, F>(
    conn: &Connection,
    sql: &str,
    params: P,
    map_row: F,
) -> Result<Vec<T>, StoreError>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(StoreError::NotReadOnly(sql.to_string()));
    }

    let rows = stmt.query_map(params, map_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Runs a write statement and returns the number of affected rows.
///
/// # Errors
///
/// Returns `StoreError::Conflict` on constraint violations and
/// `StoreError::Database` on other SQL failures.
pub fn exec<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<usize, StoreError> {
    let affected = conn.execute(sql, params)?;
    tracing::debug!(affected, "exec");
    Ok(affected)
}
