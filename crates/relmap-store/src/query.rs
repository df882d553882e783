//! Filtered reads with optional eager loading.
//!
//! A [`Query`] collects filters and preloads, then runs as `first`, `find` or
//! `count`. The SQL is assembled from the entity's [`TableDef`]: column names
//! in filters are checked against the descriptor and every value is bound as
//! a positional parameter, so nothing caller-supplied is ever spliced into the
//! statement text.
//!
//! Soft-deleted rows are skipped unless [`Query::with_deleted`] is set.

use std::fmt;
use std::marker::PhantomData;

use relmap_db::{quote_ident, TableDef};
use rusqlite::types::ToSql;
use rusqlite::Connection;

use crate::entity::Entity;
use crate::error::StoreError;

enum Condition {
    Compare(&'static str, Box<dyn ToSql>),
    IsNull,
    IsNotNull,
    In(Vec<Box<dyn ToSql>>),
}

/// A single predicate on one column.
pub struct Filter {
    column: String,
    condition: Condition,
}

impl Filter {
    fn compare<T: ToSql + 'static>(column: &str, op: &'static str, value: T) -> Self {
        Self {
            column: column.to_string(),
            condition: Condition::Compare(op, Box::new(value)),
        }
    }

    pub fn eq<T: ToSql + 'static>(column: &str, value: T) -> Self {
        Self::compare(column, "=", value)
    }

    pub fn ne<T: ToSql + 'static>(column: &str, value: T) -> Self {
        Self::compare(column, "<>", value)
    }

    pub fn gt<T: ToSql + 'static>(column: &str, value: T) -> Self {
        Self::compare(column, ">", value)
    }

    pub fn lt<T: ToSql + 'static>(column: &str, value: T) -> Self {
        Self::compare(column, "<", value)
    }

    /// SQL `LIKE` with the caller's pattern (`%` and `_` are wildcards).
    pub fn like(column: &str, pattern: impl Into<String>) -> Self {
        Self::compare(column, "LIKE", pattern.into())
    }

    pub fn is_null(column: &str) -> Self {
        Self {
            column: column.to_string(),
            condition: Condition::IsNull,
        }
    }

    pub fn is_not_null(column: &str) -> Self {
        Self {
            column: column.to_string(),
            condition: Condition::IsNotNull,
        }
    }

    /// Matches any of `values`. An empty list matches nothing.
    pub fn is_in<T: ToSql + 'static>(column: &str, values: impl IntoIterator<Item = T>) -> Self {
        Self {
            column: column.to_string(),
            condition: Condition::In(
                values
                    .into_iter()
                    .map(|v| Box::new(v) as Box<dyn ToSql>)
                    .collect(),
            ),
        }
    }

    /// Appends this predicate's SQL and parameters.
    fn render<'a>(
        &'a self,
        table: &'static TableDef,
        params: &mut Vec<&'a dyn ToSql>,
    ) -> Result<String, StoreError> {
        if !table.has_column(&self.column) {
            return Err(StoreError::UnknownColumn {
                table: table.name,
                column: self.column.clone(),
            });
        }

        let column = format!("{}.{}", quote_ident(table.name), quote_ident(&self.column));
        let sql = match &self.condition {
            Condition::Compare(op, value) => {
                params.push(value.as_ref());
                format!("{column} {op} ?{}", params.len())
            }
            Condition::IsNull => format!("{column} IS NULL"),
            Condition::IsNotNull => format!("{column} IS NOT NULL"),
            Condition::In(values) if values.is_empty() => "0".to_string(),
            Condition::In(values) => {
                let mut placeholders = Vec::with_capacity(values.len());
                for value in values {
                    params.push(value.as_ref());
                    placeholders.push(format!("?{}", params.len()));
                }
                format!("{column} IN ({})", placeholders.join(", "))
            }
        };
        Ok(sql)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let condition = match &self.condition {
            Condition::Compare(op, _) => format!("{op} ?"),
            Condition::IsNull => "IS NULL".to_string(),
            Condition::IsNotNull => "IS NOT NULL".to_string(),
            Condition::In(values) => format!("IN ({} values)", values.len()),
        };
        f.debug_struct("Filter")
            .field("column", &self.column)
            .field("condition", &condition)
            .finish()
    }
}

/// A read against one entity's table.
pub struct Query<E: Entity> {
    filters: Vec<Filter>,
    preloads: Vec<E::Relation>,
    limit: Option<i64>,
    with_deleted: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("table", &E::table().name)
            .field("filters", &self.filters)
            .field("preloads", &self.preloads)
            .field("limit", &self.limit)
            .field("with_deleted", &self.with_deleted)
            .finish()
    }
}

impl<E: Entity> Query<E> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            preloads: Vec::new(),
            limit: None,
            with_deleted: false,
            _entity: PhantomData,
        }
    }

    /// Adds a predicate. Predicates are combined with `AND`.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Eager-loads `relation` onto every returned entity. Can be chained;
    /// repeating a relation loads it once.
    pub fn preload(mut self, relation: E::Relation) -> Self {
        if !self.preloads.contains(&relation) {
            self.preloads.push(relation);
        }
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Includes soft-deleted rows.
    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }

    /// Builds the `WHERE` clause (possibly empty) and its parameters.
    fn where_clause<'a>(
        &'a self,
        params: &mut Vec<&'a dyn ToSql>,
    ) -> Result<String, StoreError> {
        let table = E::table();
        let mut clauses = Vec::with_capacity(self.filters.len() + 1);
        if !self.with_deleted {
            clauses.push(format!(
                "{}.{} IS NULL",
                quote_ident(table.name),
                quote_ident("deleted_at")
            ));
        }
        for filter in &self.filters {
            clauses.push(filter.render(table, params)?);
        }
        if clauses.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", clauses.join(" AND ")))
        }
    }

    fn select(&self, conn: &Connection, limit: Option<i64>) -> Result<Vec<E>, StoreError> {
        let table = E::table();
        let mut params: Vec<&dyn ToSql> = Vec::new();
        let where_clause = self.where_clause(&mut params)?;

        let mut sql = format!(
            "SELECT {} FROM {}{} ORDER BY {}.{} ASC",
            table.select_list(),
            quote_ident(table.name),
            where_clause,
            quote_ident(table.name),
            quote_ident("id")
        );
        if let Some(ref limit) = limit {
            params.push(limit);
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), E::from_row)?;
        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }

        for relation in &self.preloads {
            E::preload(conn, &mut entities, *relation)?;
        }

        Ok(entities)
    }

    /// Returns every matching row, ordered by id.
    pub fn find(&self, conn: &Connection) -> Result<Vec<E>, StoreError> {
        self.select(conn, self.limit)
    }

    /// Returns the matching row with the lowest id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when nothing matches.
    pub fn first(&self, conn: &Connection) -> Result<E, StoreError> {
        match self.select(conn, Some(1))?.into_iter().next() {
            Some(entity) => Ok(entity),
            None => {
                // An ordinary outcome, so never logged above debug.
                tracing::debug!(entity = E::NAME, "no matching row");
                Err(StoreError::NotFound { entity: E::NAME })
            }
        }
    }

    /// Counts matching rows. Preloads and limit are ignored.
    pub fn count(&self, conn: &Connection) -> Result<i64, StoreError> {
        let table = E::table();
        let mut params: Vec<&dyn ToSql> = Vec::new();
        let where_clause = self.where_clause(&mut params)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            quote_ident(table.name),
            where_clause
        );
        Ok(conn.query_row(&sql, params.as_slice(), |row| row.get(0))?)
    }
}

/// Marks the row with the given id as deleted.
///
/// The row stays in the table and is hidden from reads that do not ask for
/// deleted rows. Dependent rows are not touched. Returns the number of rows
/// marked (0 if the id is unknown or already deleted).
pub fn soft_delete<E: Entity>(conn: &Connection, id: i64) -> Result<usize, StoreError> {
    let table = E::table();
    let sql = format!(
        "UPDATE {} SET deleted_at = datetime('now'), updated_at = datetime('now')
         WHERE id = ?1 AND deleted_at IS NULL",
        quote_ident(table.name)
    );
    let affected = conn.execute(&sql, [id])?;
    tracing::debug!(table = table.name, id, affected, "soft delete");
    Ok(affected)
}
