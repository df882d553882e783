//! Eager loading of related rows.
//!
//! Each preload issues one follow-up query for the whole result set (an
//! `IN (...)` over the parent or owner ids, chunked to stay under SQLite's
//! parameter limit) and then distributes the loaded rows onto their parents.
//! Loading `Notes` for a set of users therefore returns exactly what a
//! `find` filtered by `user_id` would.

use std::collections::HashMap;
use std::str::FromStr;

use relmap_types::{CreditCard, Note, User};
use rusqlite::Connection;

use crate::entity::Entity;
use crate::error::StoreError;
use crate::query::Filter;

/// Maximum ids bound into a single `IN (...)` clause.
const PRELOAD_CHUNK: usize = 500;

/// Relations of a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRelation {
    Notes,
    CreditCards,
}

/// Relations of a [`Note`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteRelation {
    User,
}

/// Relations of a [`CreditCard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreditCardRelation {
    User,
}

/// Error returned when a relation name does not exist on an entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} has no relation named '{name}'")]
pub struct ParseRelationError {
    pub entity: &'static str,
    pub name: String,
}

impl FromStr for UserRelation {
    type Err = ParseRelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Notes" => Ok(Self::Notes),
            "CreditCards" => Ok(Self::CreditCards),
            _ => Err(ParseRelationError {
                entity: User::NAME,
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for NoteRelation {
    type Err = ParseRelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            _ => Err(ParseRelationError {
                entity: Note::NAME,
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for CreditCardRelation {
    type Err = ParseRelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            _ => Err(ParseRelationError {
                entity: CreditCard::NAME,
                name: s.to_string(),
            }),
        }
    }
}

/// An entity holding a `user_id` foreign key.
pub(crate) trait BelongsToUser: Entity {
    fn user_id(&self) -> i64;
}

impl BelongsToUser for Note {
    fn user_id(&self) -> i64 {
        self.user_id
    }
}

impl BelongsToUser for CreditCard {
    fn user_id(&self) -> i64 {
        self.user_id
    }
}

/// Loads live `C` rows whose `column` is one of `ids`, [`PRELOAD_CHUNK`] ids
/// per query.
fn load_in_chunks<C: Entity>(
    conn: &Connection,
    column: &str,
    ids: &[i64],
) -> Result<Vec<C>, StoreError> {
    let mut loaded = Vec::new();
    for chunk in ids.chunks(PRELOAD_CHUNK) {
        let mut rows = C::query()
            .filter(Filter::is_in(column, chunk.to_vec()))
            .find(conn)?;
        loaded.append(&mut rows);
    }
    Ok(loaded)
}

/// One-to-many: loads every live `C` whose `user_id` is among `users` and
/// hands each user its children, ordered by id.
pub(crate) fn attach_children<C, F>(
    conn: &Connection,
    users: &mut [User],
    mut assign: F,
) -> Result<(), StoreError>
where
    C: BelongsToUser,
    F: FnMut(&mut User, Vec<C>),
{
    if users.is_empty() {
        return Ok(());
    }

    let mut ids: Vec<i64> = users.iter().map(User::id).collect();
    ids.sort_unstable();
    ids.dedup();

    let children: Vec<C> = load_in_chunks(conn, "user_id", &ids)?;
    tracing::debug!(
        relation = C::table().name,
        parents = ids.len(),
        loaded = children.len(),
        "preloaded children"
    );

    let mut by_owner: HashMap<i64, Vec<C>> = HashMap::new();
    for child in children {
        by_owner.entry(child.user_id()).or_default().push(child);
    }

    for user in users.iter_mut() {
        let owned = by_owner.remove(&user.id()).unwrap_or_default();
        assign(user, owned);
    }

    Ok(())
}

/// Belongs-to: loads the owning user of every row. Rows whose owner is
/// missing or soft-deleted get `None`.
pub(crate) fn attach_owner<C, K, F>(
    conn: &Connection,
    rows: &mut [C],
    owner_id: K,
    mut assign: F,
) -> Result<(), StoreError>
where
    K: Fn(&C) -> i64,
    F: FnMut(&mut C, Option<User>),
{
    if rows.is_empty() {
        return Ok(());
    }

    let mut ids: Vec<i64> = rows.iter().map(&owner_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let owners: Vec<User> = load_in_chunks(conn, "id", &ids)?;
    let by_id: HashMap<i64, User> = owners.into_iter().map(|u| (u.id(), u)).collect();

    for row in rows.iter_mut() {
        let owner = by_id.get(&owner_id(&*row)).cloned();
        assign(row, owner);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_names_parse() {
        assert_eq!("Notes".parse::<UserRelation>(), Ok(UserRelation::Notes));
        assert_eq!(
            "CreditCards".parse::<UserRelation>(),
            Ok(UserRelation::CreditCards)
        );
        assert_eq!("User".parse::<NoteRelation>(), Ok(NoteRelation::User));
        assert_eq!(
            "User".parse::<CreditCardRelation>(),
            Ok(CreditCardRelation::User)
        );
    }

    #[test]
    fn unknown_relation_names_are_rejected() {
        let err = "Comments".parse::<UserRelation>().expect_err("no such relation");
        assert_eq!(err.entity, "user");
        assert_eq!(err.to_string(), "user has no relation named 'Comments'");

        assert!("Notes".parse::<NoteRelation>().is_err());
    }
}
