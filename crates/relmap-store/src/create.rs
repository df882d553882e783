//! Inserts, including nested insert graphs.

use relmap_types::{CreditCard, NewCreditCard, NewNote, NewUser, Note, User};
use rusqlite::{params, Connection};

use crate::entity::Entity;
use crate::error::StoreError;
use crate::session::with_savepoint;

/// Inserts a user together with every nested note and credit card.
///
/// The dependents get the new user's id as their foreign key. The whole
/// graph is written under a savepoint: if any insert fails, none of the rows
/// remain. Works both inside and outside an enclosing transaction.
///
/// # Errors
///
/// Returns `StoreError::Conflict` if a row violates a constraint (for
/// example an over-long username) and `StoreError::Database` on other SQL
/// failures.
pub fn create_user(conn: &Connection, new_user: &NewUser) -> Result<User, StoreError> {
    with_savepoint(conn, "create_user", |conn| {
        let mut user = conn.query_row(
            "INSERT INTO users (username, password) VALUES (?1, ?2) RETURNING *",
            params![new_user.username, new_user.password],
            User::from_row,
        )?;

        for note in &new_user.notes {
            let note = create_note(conn, user.id(), note)?;
            user.notes.push(note);
        }
        for card in &new_user.credit_cards {
            let card = create_credit_card(conn, user.id(), card)?;
            user.credit_cards.push(card);
        }

        tracing::debug!(
            user_id = user.id(),
            notes = user.notes.len(),
            credit_cards = user.credit_cards.len(),
            "created user"
        );
        Ok(user)
    })
}

/// Inserts a note owned by `user_id`.
///
/// # Errors
///
/// Returns `StoreError::Conflict` if `user_id` does not reference a user.
pub fn create_note(conn: &Connection, user_id: i64, note: &NewNote) -> Result<Note, StoreError> {
    Ok(conn.query_row(
        "INSERT INTO notes (name, content, user_id) VALUES (?1, ?2, ?3) RETURNING *",
        params![note.name, note.content, user_id],
        Note::from_row,
    )?)
}

/// Inserts a credit card owned by `user_id`.
///
/// # Errors
///
/// Returns `StoreError::Conflict` if `user_id` does not reference a user.
pub fn create_credit_card(
    conn: &Connection,
    user_id: i64,
    card: &NewCreditCard,
) -> Result<CreditCard, StoreError> {
    Ok(conn.query_row(
        "INSERT INTO credit_cards (number, user_id) VALUES (?1, ?2) RETURNING *",
        params![card.number, user_id],
        CreditCard::from_row,
    )?)
}
