//! Relational mapping and query layer for relmap.
//!
//! Maps [`User`](relmap_types::User), [`Note`](relmap_types::Note) and
//! [`CreditCard`](relmap_types::CreditCard) onto the `users`, `notes` and
//! `credit_cards` tables and exposes:
//!
//! | Operation | Entry point |
//! |-----------|-------------|
//! | Migrate | [`Session::migrate`] |
//! | Create (with nested dependents) | [`create_user`], [`create_note`], [`create_credit_card`] |
//! | First / Find / Count | [`Entity::query`] → [`Query::first`], [`Query::find`], [`Query::count`] |
//! | Preload | [`Query::preload`] with [`UserRelation`], [`NoteRelation`], [`CreditCardRelation`] |
//! | Raw query / Exec | [`raw_query`], [`exec`] |
//! | Transaction | [`Session::transaction`] |
//!
//! Store functions take a `&Connection`, so the same call works on a
//! connection from [`Session::with_conn`] or inside a transaction.
//!
//! # Usage
//!
//! ```rust,ignore
//! use relmap_store::{Entity, Filter, Session, UserRelation};
//! use relmap_types::User;
//!
//! let session = Session::open("relmap.db", Default::default())?;
//! session.migrate()?;
//!
//! let alice = session.with_conn(|conn| {
//!     User::query()
//!         .filter(Filter::eq("username", "alice@example.com"))
//!         .preload(UserRelation::Notes)
//!         .preload(UserRelation::CreditCards)
//!         .first(conn)
//! })?;
//! ```

mod create;
mod entity;
mod error;
mod preload;
mod query;
mod raw;
mod reports;
mod schema;
mod seed;
mod session;

pub use create::{create_credit_card, create_note, create_user};
pub use entity::Entity;
pub use error::StoreError;
pub use preload::{CreditCardRelation, NoteRelation, ParseRelationError, UserRelation};
pub use query::{soft_delete, Filter, Query};
pub use raw::{exec, raw_query};
pub use reports::{user_cards, users_with_more_notes_than, NoteCount, UserCard};
pub use schema::{CREDIT_CARDS, NOTES, SCHEMA, USERS};
pub use seed::{seed_sample_data, SeedOutcome};
pub use session::Session;

#[cfg(test)]
mod tests;
