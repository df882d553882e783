//! Mapping between entity types and their tables.

use relmap_db::TableDef;
use relmap_types::{CreditCard, Note, Record, User};
use rusqlite::{Connection, Row};

use crate::error::StoreError;
use crate::preload::{self, CreditCardRelation, NoteRelation, UserRelation};
use crate::query::Query;
use crate::schema::{CREDIT_CARDS, NOTES, USERS};

/// A type stored as one row of one table.
///
/// Rows are read with the table's full column list (see
/// [`TableDef::select_list`]) and mapped by column name.
pub trait Entity: Sized {
    /// Relations that can be eager-loaded onto this entity.
    type Relation: Copy + PartialEq + std::fmt::Debug;

    /// Singular name used in `NotFound` errors.
    const NAME: &'static str;

    fn table() -> &'static TableDef;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Populates `relation` on every entity in `rows` with follow-up queries.
    fn preload(
        conn: &Connection,
        rows: &mut [Self],
        relation: Self::Relation,
    ) -> Result<(), StoreError>;

    /// Starts a read against this entity's table.
    fn query() -> Query<Self> {
        Query::new()
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get("id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

impl Entity for User {
    type Relation = UserRelation;
    const NAME: &'static str = "user";

    fn table() -> &'static TableDef {
        &USERS
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            record: record_from_row(row)?,
            username: row.get("username")?,
            password: row.get("password")?,
            notes: Vec::new(),
            credit_cards: Vec::new(),
        })
    }

    fn preload(
        conn: &Connection,
        rows: &mut [Self],
        relation: UserRelation,
    ) -> Result<(), StoreError> {
        match relation {
            UserRelation::Notes => preload::attach_children::<Note, _>(conn, rows, |user, notes| {
                user.notes = notes
            }),
            UserRelation::CreditCards => {
                preload::attach_children::<CreditCard, _>(conn, rows, |user, cards| {
                    user.credit_cards = cards
                })
            }
        }
    }
}

impl Entity for Note {
    type Relation = NoteRelation;
    const NAME: &'static str = "note";

    fn table() -> &'static TableDef {
        &NOTES
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Note {
            record: record_from_row(row)?,
            name: row.get("name")?,
            content: row.get("content")?,
            user_id: row.get("user_id")?,
            user: None,
        })
    }

    fn preload(
        conn: &Connection,
        rows: &mut [Self],
        relation: NoteRelation,
    ) -> Result<(), StoreError> {
        match relation {
            NoteRelation::User => {
                preload::attach_owner(conn, rows, |note| note.user_id, |note, user| {
                    note.user = user.map(Box::new)
                })
            }
        }
    }
}

impl Entity for CreditCard {
    type Relation = CreditCardRelation;
    const NAME: &'static str = "credit card";

    fn table() -> &'static TableDef {
        &CREDIT_CARDS
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CreditCard {
            record: record_from_row(row)?,
            number: row.get("number")?,
            user_id: row.get("user_id")?,
            user: None,
        })
    }

    fn preload(
        conn: &Connection,
        rows: &mut [Self],
        relation: CreditCardRelation,
    ) -> Result<(), StoreError> {
        match relation {
            CreditCardRelation::User => {
                preload::attach_owner(conn, rows, |card| card.user_id, |card, user| {
                    card.user = user.map(Box::new)
                })
            }
        }
    }
}
