//! Table descriptors for the application schema.
//!
//! `users` has no dependencies; `notes` and `credit_cards` each carry a
//! `user_id` foreign key. Foreign keys are declared without `ON DELETE`
//! actions, so removing a user that still owns rows is rejected by the
//! database instead of cascading.

use relmap_db::{ColumnDef, ColumnType, ForeignKey, IndexDef, TableDef};
use relmap_types::{NAME_MAX_LEN, PASSWORD_MAX_LEN, USERNAME_MAX_LEN};

pub static USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        ColumnDef::required("username", ColumnType::Varchar(USERNAME_MAX_LEN)),
        ColumnDef::required("password", ColumnType::Varchar(PASSWORD_MAX_LEN)),
    ],
    foreign_keys: &[],
    indexes: &[IndexDef::new("idx_users_deleted_at", &["deleted_at"])],
};

pub static NOTES: TableDef = TableDef {
    name: "notes",
    columns: &[
        ColumnDef::required("name", ColumnType::Varchar(NAME_MAX_LEN)),
        ColumnDef::required("content", ColumnType::Text),
        ColumnDef::required("user_id", ColumnType::Integer),
    ],
    foreign_keys: &[ForeignKey::new("user_id", "users", "id")],
    indexes: &[
        IndexDef::new("idx_notes_user_id", &["user_id"]),
        IndexDef::new("idx_notes_deleted_at", &["deleted_at"]),
    ],
};

pub static CREDIT_CARDS: TableDef = TableDef {
    name: "credit_cards",
    columns: &[
        ColumnDef::required("number", ColumnType::Text),
        ColumnDef::required("user_id", ColumnType::Integer),
    ],
    foreign_keys: &[ForeignKey::new("user_id", "users", "id")],
    indexes: &[
        IndexDef::new("idx_credit_cards_user_id", &["user_id"]),
        IndexDef::new("idx_credit_cards_deleted_at", &["deleted_at"]),
    ],
};

/// Every application table, in the order they are declared.
pub static SCHEMA: [&TableDef; 3] = [&USERS, &NOTES, &CREDIT_CARDS];
