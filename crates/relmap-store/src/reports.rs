//! Read-only reporting queries built on [`raw_query`].

use rusqlite::Connection;
use serde::Serialize;

use crate::error::StoreError;
use crate::raw::raw_query;

/// A username with the number of live notes it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteCount {
    pub username: String,
    pub note_count: i64,
}

/// One row of the users-to-cards left join. Users without cards appear once
/// with `card_number` set to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCard {
    pub username: String,
    pub card_number: Option<String>,
}

/// Users owning more than `threshold` live notes, ordered by username.
pub fn users_with_more_notes_than(
    conn: &Connection,
    threshold: i64,
) -> Result<Vec<NoteCount>, StoreError> {
    raw_query(
        conn,
        "SELECT u.username, COUNT(n.id) AS note_count
         FROM users u
         JOIN notes n ON n.user_id = u.id AND n.deleted_at IS NULL
         WHERE u.deleted_at IS NULL
         GROUP BY u.id, u.username
         HAVING COUNT(n.id) > ?1
         ORDER BY u.username",
        [threshold],
        |row| {
            Ok(NoteCount {
                username: row.get(0)?,
                note_count: row.get(1)?,
            })
        },
    )
}

/// Every live user paired with each of its live cards.
pub fn user_cards(conn: &Connection) -> Result<Vec<UserCard>, StoreError> {
    raw_query(
        conn,
        "SELECT u.username, c.number
         FROM users u
         LEFT JOIN credit_cards c ON c.user_id = u.id AND c.deleted_at IS NULL
         WHERE u.deleted_at IS NULL
         ORDER BY u.id, c.id",
        [],
        |row| {
            Ok(UserCard {
                username: row.get(0)?,
                card_number: row.get(1)?,
            })
        },
    )
}
