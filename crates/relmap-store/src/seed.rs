//! Sample data for demonstrations and tests.

use relmap_types::{NewCreditCard, NewUser, User};

use crate::create::{create_credit_card, create_user};
use crate::entity::Entity;
use crate::error::StoreError;
use crate::session::Session;

/// Sample accounts: username, password and number of credit cards.
const SAMPLE_USERS: [(&str, &str, i64); 3] = [
    ("alice@example.com", "123456", 2),
    ("bob@example.com", "654321", 2),
    ("carol@example.com", "abcdef", 3),
];

/// Notes created for every sample user.
const NOTES_PER_USER: usize = 3;

/// Result of [`seed_sample_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The tables already held users; nothing was written.
    AlreadySeeded { users: i64 },
    /// Sample rows were inserted.
    Seeded { users: usize, notes: usize, credit_cards: usize },
}

/// Inserts the sample users, notes and cards unless users already exist.
///
/// Every user gets three notes; alice and bob get two cards and carol three.
/// Card numbers are derived from the owner's id so they are unique per run.
/// The existence check and all inserts happen in one immediate transaction,
/// so concurrent seeders are serialized and only one of them inserts.
///
/// # Errors
///
/// Returns `StoreError` if the count or any insert fails; in the latter case
/// nothing is kept.
pub fn seed_sample_data(session: &Session) -> Result<SeedOutcome, StoreError> {
    let outcome = session.transaction(|conn| {
        let existing = User::query().count(conn)?;
        if existing > 0 {
            return Ok(SeedOutcome::AlreadySeeded { users: existing });
        }

        let mut notes = 0;
        let mut credit_cards = 0;

        for (username, password, card_count) in SAMPLE_USERS {
            let mut new_user = NewUser::new(username, password);
            for i in 1..=NOTES_PER_USER {
                new_user = new_user.with_note(
                    format!("Note {i} of {username}"),
                    format!("Sample content {i} for testing."),
                );
            }
            let user = create_user(conn, &new_user)?;
            notes += user.notes.len();

            for i in 1..=card_count {
                let number = format!("4111-2222-3333-{:04}", user.id() * 10 + i);
                create_credit_card(conn, user.id(), &NewCreditCard::new(number))?;
                credit_cards += 1;
            }
        }

        Ok::<_, StoreError>(SeedOutcome::Seeded {
            users: SAMPLE_USERS.len(),
            notes,
            credit_cards,
        })
    })?;

    match outcome {
        SeedOutcome::AlreadySeeded { users } => {
            tracing::info!(users, "database already seeded, skipping");
        }
        SeedOutcome::Seeded { .. } => tracing::info!(?outcome, "sample data inserted"),
    }
    Ok(outcome)
}
