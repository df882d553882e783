//! Entity types shared across the relmap crates.
//!
//! These are plain data structures: they carry no database code and can be
//! serialized freely. Row mapping, schema descriptors and queries live in
//! `relmap-store`; pooling and migration live in `relmap-db`.
//!
//! Every persisted entity embeds a [`Record`] holding the bookkeeping columns
//! (`id`, timestamps, soft-delete marker). Entities compose it rather than
//! inheriting from a base type.
//!
//! Relationships:
//!
//! | Owner | Field | Dependent | Foreign key |
//! |-------|-------|-----------|-------------|
//! | `User` | `notes` | `Note` | `notes.user_id` |
//! | `User` | `credit_cards` | `CreditCard` | `credit_cards.user_id` |
//!
//! A user may own any number of credit cards. Relationship fields are only
//! populated when the read that produced the entity asked for them.

use serde::{Deserialize, Serialize};

/// Maximum length of [`User::username`], in characters.
pub const USERNAME_MAX_LEN: u32 = 64;

/// Maximum length of [`Note::name`], in characters.
pub const NAME_MAX_LEN: u32 = 255;

/// Maximum length of [`User::password`], in characters.
pub const PASSWORD_MAX_LEN: u32 = 255;

/// Bookkeeping columns present on every table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Autoincrement primary key.
    pub id: i64,
    /// Creation timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Soft-delete marker. `None` for live rows.
    pub deleted_at: Option<String>,
}

impl Record {
    /// Returns `true` if the row has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// An account owning notes and credit cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub record: Record,
    pub username: String,
    pub password: String,
    /// Populated by a `Notes` preload; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
    /// Populated by a `CreditCards` preload; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credit_cards: Vec<CreditCard>,
}

impl User {
    pub fn id(&self) -> i64 {
        self.record.id
    }
}

/// A free-text note belonging to exactly one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(flatten)]
    pub record: Record,
    pub name: String,
    pub content: String,
    pub user_id: i64,
    /// Owning user, populated by a `User` preload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

impl Note {
    pub fn id(&self) -> i64 {
        self.record.id
    }
}

/// A payment card belonging to exactly one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    #[serde(flatten)]
    pub record: Record,
    pub number: String,
    pub user_id: i64,
    /// Owning user, populated by a `User` preload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

impl CreditCard {
    pub fn id(&self) -> i64 {
        self.record.id
    }
}

/// Insert graph for a user, optionally carrying dependents.
///
/// Creating a `NewUser` inserts the user row and then every nested note and
/// card with its foreign key pointing at the new user, as one unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub notes: Vec<NewNote>,
    #[serde(default)]
    pub credit_cards: Vec<NewCreditCard>,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            notes: Vec::new(),
            credit_cards: Vec::new(),
        }
    }

    /// Adds a nested note.
    pub fn with_note(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.notes.push(NewNote::new(name, content));
        self
    }

    /// Adds a nested credit card.
    pub fn with_credit_card(mut self, number: impl Into<String>) -> Self {
        self.credit_cards.push(NewCreditCard::new(number));
        self
    }
}

/// Insert values for a note. The owner is supplied at insert time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub name: String,
    pub content: String,
}

impl NewNote {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Insert values for a credit card. The owner is supplied at insert time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCreditCard {
    pub number: String,
}

impl NewCreditCard {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
        }
    }
}
