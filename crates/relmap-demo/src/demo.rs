//! The demonstration walk-through printed by the binary.

use std::io::Write;

use relmap_store::{
    create_note, create_user, exec, user_cards, users_with_more_notes_than, Entity, Filter,
    NoteRelation, Session, StoreError, UserRelation,
};
use relmap_types::{NewNote, NewUser, Note, User};
use rusqlite::params;
use thiserror::Error;

const DEMO_USER: &str = "alice@example.com";
const NEW_USER: &str = "dave@example.com";
const ROLLBACK_USER: &str = "mallory@example.com";

/// Errors that abort the walk-through.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// The transaction meant to fail committed instead.
    #[error("transaction expected to fail was committed")]
    UnexpectedCommit,
}

/// Runs every demonstration step against `session`, writing results to `out`.
pub fn run(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    first_note_owner(session, out)?;
    user_with_relations(session, out)?;
    busy_users(session, out)?;
    cards_per_user(session, out)?;
    update_note(session, out)?;
    create_if_absent(session, out)?;
    failing_transaction(session, out)?;
    Ok(())
}

fn first_note_owner(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    let first = session.with_conn(|conn| Note::query().preload(NoteRelation::User).first(conn));
    match first {
        Ok(note) => {
            let owner = note
                .user
                .as_ref()
                .map(|user| user.username.as_str())
                .unwrap_or("<unknown>");
            writeln!(out, "first note: {:?} by {}", note.name, owner)?;
        }
        Err(err) if err.is_not_found() => writeln!(out, "first note: no notes yet")?,
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn user_with_relations(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    let (user, manual_notes) = session.with_conn(|conn| {
        let user = User::query()
            .filter(Filter::eq("username", DEMO_USER))
            .preload(UserRelation::Notes)
            .preload(UserRelation::CreditCards)
            .first(conn)?;
        let notes = Note::query()
            .filter(Filter::eq("user_id", user.id()))
            .find(conn)?;
        Ok((user, notes))
    })?;

    writeln!(
        out,
        "{} (id {}) has {} notes and {} credit cards",
        user.username,
        user.id(),
        user.notes.len(),
        user.credit_cards.len()
    )?;
    for note in &user.notes {
        writeln!(out, "  note {}: {} - {}", note.id(), note.name, note.content)?;
    }
    for card in &user.credit_cards {
        writeln!(out, "  card {}: {}", card.id(), card.number)?;
    }
    writeln!(
        out,
        "manual lookup found {} notes for user {}",
        manual_notes.len(),
        user.id()
    )?;
    Ok(())
}

fn busy_users(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    let rows = session.with_conn(|conn| users_with_more_notes_than(conn, 2))?;
    writeln!(out, "users with more than 2 notes:")?;
    for row in &rows {
        writeln!(out, "  {}: {} notes", row.username, row.note_count)?;
    }
    Ok(())
}

fn cards_per_user(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    let rows = session.with_conn(user_cards)?;
    writeln!(out, "users and their cards:")?;
    for row in &rows {
        let number = row.card_number.as_deref().unwrap_or("<none>");
        writeln!(out, "  {}: {}", row.username, number)?;
    }
    Ok(())
}

fn update_note(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    let affected = session.with_conn(|conn| {
        exec(
            conn,
            "UPDATE notes SET content = ?1, updated_at = datetime('now')
             WHERE name = ?2 AND deleted_at IS NULL",
            params!["Updated content via exec.", format!("Note 1 of {DEMO_USER}")],
        )
    })?;
    writeln!(out, "exec update affected {affected} row(s)")?;
    Ok(())
}

fn create_if_absent(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    let created = session.transaction(|conn| {
        match User::query().filter(Filter::eq("username", NEW_USER)).first(conn) {
            Ok(existing) => Ok::<_, StoreError>((existing, false)),
            Err(err) if err.is_not_found() => {
                let new_user = NewUser::new(NEW_USER, "secret")
                    .with_note("Welcome", "Created in a transaction.");
                let user = create_user(conn, &new_user)?;
                Ok((user, true))
            }
            Err(err) => Err(err),
        }
    })?;

    let (user, fresh) = created;
    if fresh {
        writeln!(
            out,
            "transaction committed: created {} (id {})",
            user.username,
            user.id()
        )?;
    } else {
        writeln!(
            out,
            "transaction committed: {} already present (id {})",
            user.username,
            user.id()
        )?;
    }
    Ok(())
}

fn failing_transaction(session: &Session, out: &mut impl Write) -> Result<(), DemoError> {
    let count_users = || session.with_conn(|conn| User::query().count(conn));
    let before = count_users()?;

    let result = session.transaction(|conn| {
        let user = create_user(conn, &NewUser::new(ROLLBACK_USER, "secret"))?;
        create_note(conn, user.id(), &NewNote::new("first", "Undone with the rest."))?;
        create_note(conn, i64::MAX, &NewNote::new("orphan", "Owner does not exist."))
    });

    match result {
        Ok(_) => return Err(DemoError::UnexpectedCommit),
        Err(err) => writeln!(out, "transaction rolled back: {err}")?,
    }

    let after = count_users()?;
    writeln!(out, "user count before {before}, after {after}")?;
    Ok(())
}
