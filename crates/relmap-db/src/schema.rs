//! Table and column descriptors consumed by [`crate::migrate`].
//!
//! Descriptors are `'static` values, typically declared as `static` items by
//! the crate that owns the schema:
//!
//! ```rust,ignore
//! static NOTES: TableDef = TableDef {
//!     name: "notes",
//!     columns: &[
//!         ColumnDef::required("name", ColumnType::Varchar(255)),
//!         ColumnDef::required("user_id", ColumnType::Integer),
//!     ],
//!     foreign_keys: &[ForeignKey::new("user_id", "users", "id")],
//!     indexes: &[IndexDef::new("idx_notes_user_id", &["user_id"])],
//! };
//! ```
//!
//! Every table implicitly starts with [`BOOKKEEPING_COLUMNS`].

use std::fmt;

/// SQL storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    /// Bounded text. SQLite stores it with TEXT affinity.
    Varchar(u32),
    /// ISO-8601 text timestamp.
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("INTEGER"),
            Self::Text => f.write_str("TEXT"),
            Self::Varchar(n) => write!(f, "VARCHAR({n})"),
            Self::Timestamp => f.write_str("TIMESTAMP"),
        }
    }
}

/// A single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Raw SQL default expression, emitted as `DEFAULT (<expr>)`.
    pub default: Option<&'static str>,
    /// Autoincrement integer primary key.
    pub primary_key: bool,
}

impl ColumnDef {
    /// A `NOT NULL` column without a default.
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            default: None,
            primary_key: false,
        }
    }

    /// A nullable column.
    pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    /// A `NOT NULL` column with a SQL default expression.
    pub const fn with_default(name: &'static str, ty: ColumnType, expr: &'static str) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            default: Some(expr),
            primary_key: false,
        }
    }

    /// Column definition as it appears inside `CREATE TABLE` or
    /// `ALTER TABLE ... ADD COLUMN`.
    pub fn definition_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(self.name), self.ty);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
            return sql;
        }
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(expr) = self.default {
            sql.push_str(" DEFAULT (");
            sql.push_str(expr);
            sql.push(')');
        }
        if let ColumnType::Varchar(max) = self.ty {
            // SQLite ignores the declared length.
            sql.push_str(&format!(
                " CHECK (length({}) <= {max})",
                quote_ident(self.name)
            ));
        }
        sql
    }

    /// Whether `ALTER TABLE ... ADD COLUMN` can add this column to a table
    /// that already holds rows. SQLite only accepts constant defaults there,
    /// so function-call defaults such as `datetime('now')` do not qualify.
    pub fn can_be_added_later(&self) -> bool {
        if self.primary_key {
            return false;
        }
        match self.default {
            Some(expr) => !expr.contains('('),
            None => self.nullable,
        }
    }
}

/// Bookkeeping columns shared by every table: id, timestamps and the
/// soft-delete marker.
pub static BOOKKEEPING_COLUMNS: [ColumnDef; 4] = [
    ColumnDef {
        name: "id",
        ty: ColumnType::Integer,
        nullable: false,
        default: None,
        primary_key: true,
    },
    ColumnDef::with_default("created_at", ColumnType::Timestamp, "datetime('now')"),
    ColumnDef::with_default("updated_at", ColumnType::Timestamp, "datetime('now')"),
    ColumnDef::optional("deleted_at", ColumnType::Timestamp),
];

/// A foreign key from a column of this table to another table's column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    pub const fn new(
        column: &'static str,
        references_table: &'static str,
        references_column: &'static str,
    ) -> Self {
        Self {
            column,
            references_table,
            references_column,
        }
    }
}

/// A secondary, non-unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl IndexDef {
    pub const fn new(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, columns }
    }

    pub fn create_sql(&self, table: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(self.name),
            quote_ident(table),
            columns.join(", ")
        )
    }
}

/// A table: its own columns, foreign keys and indexes. The bookkeeping
/// columns are prepended automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub foreign_keys: &'static [ForeignKey],
    pub indexes: &'static [IndexDef],
}

impl TableDef {
    /// All columns in storage order: bookkeeping first, then the table's own.
    pub fn all_columns(&self) -> impl Iterator<Item = &ColumnDef> + '_ {
        BOOKKEEPING_COLUMNS.iter().chain(self.columns.iter())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.all_columns().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Comma-separated, table-qualified list of every column, for `SELECT`.
    pub fn select_list(&self) -> String {
        let columns: Vec<String> = self
            .all_columns()
            .map(|c| format!("{}.{}", quote_ident(self.name), quote_ident(c.name)))
            .collect();
        columns.join(", ")
    }

    /// Names of the other tables this one references. Self references are
    /// left out since they do not constrain creation order.
    pub fn depends_on(&self) -> Vec<&'static str> {
        let mut deps: Vec<&'static str> = Vec::new();
        for fk in self.foreign_keys {
            if fk.references_table != self.name && !deps.contains(&fk.references_table) {
                deps.push(fk.references_table);
            }
        }
        deps
    }

    pub fn create_table_sql(&self) -> String {
        let mut parts: Vec<String> = self.all_columns().map(ColumnDef::definition_sql).collect();
        for fk in self.foreign_keys {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_ident(fk.column),
                quote_ident(fk.references_table),
                quote_ident(fk.references_column)
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_ident(self.name),
            parts.join(",\n    ")
        )
    }
}

/// Quotes an SQL identifier, doubling any embedded quote characters.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
