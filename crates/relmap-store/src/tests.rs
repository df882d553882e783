//! Unit tests for the mapping and query layer, on a single in-memory
//! connection.

use relmap_types::{
    CreditCard, NewCreditCard, NewNote, NewUser, Note, User, PASSWORD_MAX_LEN, USERNAME_MAX_LEN,
};
use rusqlite::Connection;

use crate::create::{create_credit_card, create_note, create_user};
use crate::entity::Entity;
use crate::error::StoreError;
use crate::preload::{CreditCardRelation, NoteRelation, UserRelation};
use crate::query::{soft_delete, Filter};
use crate::raw::{exec, raw_query};
use crate::reports::{user_cards, users_with_more_notes_than, UserCard};
use crate::schema::SCHEMA;
use crate::session::with_savepoint;

/// Creates an in-memory SQLite database with the schema applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("should enable foreign keys");
    relmap_db::migrate(&conn, &SCHEMA).expect("migrations should succeed");
    conn
}

fn user_with_notes(username: &str, notes: usize) -> NewUser {
    let mut user = NewUser::new(username, "secret");
    for i in 1..=notes {
        user = user.with_note(format!("note {i}"), format!("content {i}"));
    }
    user
}

// ── create ──────────────────────────────────────────────────────────

#[test]
fn create_user_inserts_nested_dependents() {
    let conn = test_db();
    let new_user = user_with_notes("alice@example.com", 2).with_credit_card("4111-0000-0000-0001");

    let user = create_user(&conn, &new_user).expect("create should succeed");

    assert!(user.id() > 0);
    assert!(!user.record.created_at.is_empty());
    assert_eq!(user.record.deleted_at, None);
    assert_eq!(user.notes.len(), 2);
    assert_eq!(user.credit_cards.len(), 1);
    assert!(user.notes.iter().all(|n| n.user_id == user.id()));
    assert_eq!(user.credit_cards[0].user_id, user.id());
}

#[test]
fn find_by_user_returns_every_nested_note() {
    let conn = test_db();
    for n in [0usize, 1, 4] {
        let user = create_user(&conn, &user_with_notes(&format!("user{n}"), n))
            .expect("create should succeed");
        let notes = Note::query()
            .filter(Filter::eq("user_id", user.id()))
            .find(&conn)
            .expect("find should succeed");
        assert_eq!(notes.len(), n, "user with {n} notes");
    }
}

#[test]
fn failing_nested_insert_leaves_no_parent_row() {
    let conn = test_db();
    let new_user = NewUser::new("bob@example.com", "secret")
        .with_note("fine", "ok")
        .with_note("x".repeat(300), "name longer than the column allows");

    let err = create_user(&conn, &new_user).expect_err("over-long note name should fail");
    assert!(err.is_conflict(), "{err:?}");

    assert_eq!(User::query().count(&conn).expect("count"), 0);
    assert_eq!(Note::query().count(&conn).expect("count"), 0);
}

#[test]
fn create_note_for_missing_user_is_a_conflict() {
    let conn = test_db();
    let err = create_note(&conn, 999, &NewNote::new("orphan", "no owner"))
        .expect_err("foreign key should reject the note");
    assert!(err.is_conflict(), "{err:?}");

    let err = create_credit_card(&conn, 999, &NewCreditCard::new("4111"))
        .expect_err("foreign key should reject the card");
    assert!(err.is_conflict(), "{err:?}");
}

#[test]
fn over_long_username_is_a_conflict() {
    let conn = test_db();
    let err = create_user(&conn, &NewUser::new("u".repeat(65), "secret"))
        .expect_err("username is limited to 64 characters");
    assert!(err.is_conflict(), "{err:?}");

    let longest = "u".repeat(USERNAME_MAX_LEN as usize);
    create_user(&conn, &NewUser::new(longest, "secret")).expect("limit itself is allowed");
}

#[test]
fn password_is_limited_to_its_own_length() {
    let conn = test_db();
    let limit = PASSWORD_MAX_LEN as usize;

    create_user(&conn, &NewUser::new("alice", "p".repeat(limit)))
        .expect("password at the limit is allowed");
    let err = create_user(&conn, &NewUser::new("bob", "p".repeat(limit + 1)))
        .expect_err("password over the limit");
    assert!(err.is_conflict(), "{err:?}");
}

#[test]
fn failed_savepoint_release_rolls_back_and_closes_transaction() {
    let conn = test_db();

    // Deferred foreign keys are checked when the outermost savepoint is
    // released, so the insert succeeds and RELEASE fails. The pragma resets
    // at the end of every transaction.
    let err = with_savepoint(&conn, "orphan_note", |conn| {
        conn.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
        create_note(conn, 999, &NewNote::new("orphan", "no owner"))
    })
    .expect_err("release should fail on the dangling foreign key");
    assert!(err.is_conflict(), "{err:?}");

    assert!(conn.is_autocommit(), "no transaction may be left open");
    assert_eq!(Note::query().with_deleted().count(&conn).expect("count"), 0);

    let user = with_savepoint(&conn, "after", |conn| {
        create_user(conn, &NewUser::new("alice", "secret"))
    })
    .expect("connection is usable afterwards");
    assert_eq!(User::query().count(&conn).expect("count"), 1);
    assert!(user.id() > 0);
}

// ── first / find ────────────────────────────────────────────────────

#[test]
fn first_on_empty_table_is_not_found() {
    let conn = test_db();
    let err = Note::query().first(&conn).expect_err("table is empty");
    assert!(matches!(err, StoreError::NotFound { entity: "note" }), "{err:?}");
}

#[test]
fn first_without_match_is_not_found() {
    let conn = test_db();
    create_user(&conn, &NewUser::new("alice@example.com", "secret")).expect("create");

    let err = User::query()
        .filter(Filter::eq("username", "nobody@example.com"))
        .first(&conn)
        .expect_err("no such user");
    assert!(err.is_not_found(), "{err:?}");
}

#[test]
fn first_returns_lowest_id() {
    let conn = test_db();
    let a = create_user(&conn, &NewUser::new("a", "1")).expect("create");
    create_user(&conn, &NewUser::new("b", "2")).expect("create");

    let first = User::query().first(&conn).expect("first");
    assert_eq!(first.id(), a.id());
}

#[test]
fn filters_combine_with_and() {
    let conn = test_db();
    create_user(&conn, &NewUser::new("alice@example.com", "123456")).expect("create");
    create_user(&conn, &NewUser::new("alan@example.com", "654321")).expect("create");
    create_user(&conn, &NewUser::new("bob@example.com", "123456")).expect("create");

    let users = User::query()
        .filter(Filter::like("username", "al%"))
        .filter(Filter::ne("password", "654321"))
        .find(&conn)
        .expect("find");
    let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, ["alice@example.com"]);

    let limited = User::query().limit(2).find(&conn).expect("find");
    assert_eq!(limited.len(), 2);
}

#[test]
fn unknown_filter_column_is_rejected() {
    let conn = test_db();
    let err = User::query()
        .filter(Filter::eq("username = '' OR 1=1 --", "x"))
        .find(&conn)
        .expect_err("column does not exist");
    match err {
        StoreError::UnknownColumn { table, column } => {
            assert_eq!(table, "users");
            assert_eq!(column, "username = '' OR 1=1 --");
        }
        other => panic!("unexpected error type: {other:?}"),
    }
}

#[test]
fn empty_in_list_matches_nothing() {
    let conn = test_db();
    create_user(&conn, &NewUser::new("a", "1")).expect("create");
    let users = User::query()
        .filter(Filter::is_in("id", Vec::<i64>::new()))
        .find(&conn)
        .expect("find");
    assert!(users.is_empty());
}

// ── preload ─────────────────────────────────────────────────────────

#[test]
fn preload_notes_matches_manual_find() {
    let conn = test_db();
    create_user(&conn, &user_with_notes("alice", 3)).expect("create");
    let bob = create_user(&conn, &user_with_notes("bob", 2)).expect("create");

    let loaded = User::query()
        .filter(Filter::eq("id", bob.id()))
        .preload(UserRelation::Notes)
        .first(&conn)
        .expect("first");

    let manual = Note::query()
        .filter(Filter::eq("user_id", bob.id()))
        .find(&conn)
        .expect("find");

    assert_eq!(loaded.notes, manual);
    assert!(loaded.credit_cards.is_empty(), "cards were not requested");
}

#[test]
fn chained_preloads_populate_every_relation() {
    let conn = test_db();
    create_user(
        &conn,
        &user_with_notes("alice", 2)
            .with_credit_card("4111-1")
            .with_credit_card("4111-2"),
    )
    .expect("create");
    create_user(&conn, &user_with_notes("bob", 1)).expect("create");

    let users = User::query()
        .preload(UserRelation::Notes)
        .preload(UserRelation::CreditCards)
        .preload(UserRelation::Notes)
        .find(&conn)
        .expect("find");

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].notes.len(), 2);
    assert_eq!(users[0].credit_cards.len(), 2);
    assert_eq!(users[1].notes.len(), 1);
    assert!(users[1].credit_cards.is_empty());
}

#[test]
fn note_and_card_preload_their_owner() {
    let conn = test_db();
    let alice = create_user(
        &conn,
        &user_with_notes("alice", 1).with_credit_card("4111-1"),
    )
    .expect("create");

    let note = Note::query()
        .preload(NoteRelation::User)
        .first(&conn)
        .expect("first");
    let owner = note.user.expect("owner should be loaded");
    assert_eq!(owner.username, "alice");
    assert_eq!(owner.id(), alice.id());

    let card: CreditCard = CreditCard::query()
        .preload(CreditCardRelation::User)
        .first(&conn)
        .expect("first");
    assert_eq!(card.user.map(|u| u.username), Some("alice".to_string()));
}

#[test]
fn preload_on_empty_result_is_a_no_op() {
    let conn = test_db();
    let users = User::query()
        .preload(UserRelation::Notes)
        .find(&conn)
        .expect("find");
    assert!(users.is_empty());
}

// ── soft delete ─────────────────────────────────────────────────────

#[test]
fn soft_delete_hides_row_but_keeps_dependents() {
    let conn = test_db();
    let alice = create_user(&conn, &user_with_notes("alice", 2)).expect("create");

    assert_eq!(soft_delete::<User>(&conn, alice.id()).expect("delete"), 1);
    assert_eq!(
        soft_delete::<User>(&conn, alice.id()).expect("delete"),
        0,
        "already deleted"
    );

    assert!(User::query().first(&conn).expect_err("hidden").is_not_found());
    let deleted = User::query().with_deleted().first(&conn).expect("visible");
    assert!(deleted.record.is_deleted());

    let notes = Note::query()
        .preload(NoteRelation::User)
        .find(&conn)
        .expect("find");
    assert_eq!(notes.len(), 2, "no cascade to notes");
    assert!(notes.iter().all(|n| n.user.is_none()), "owner is hidden");
}

#[test]
fn hard_delete_of_owner_with_notes_is_a_conflict() {
    let conn = test_db();
    let alice = create_user(&conn, &user_with_notes("alice", 1)).expect("create");

    let err = exec(&conn, "DELETE FROM users WHERE id = ?1", [alice.id()])
        .expect_err("notes still reference the user");
    assert!(err.is_conflict(), "{err:?}");
    assert_eq!(User::query().count(&conn).expect("count"), 1);
}

// ── raw query / exec ────────────────────────────────────────────────

#[test]
fn raw_query_binds_untrusted_input_as_data() {
    let conn = test_db();
    create_user(&conn, &NewUser::new("alice", "secret")).expect("create");

    for hostile in ["alice' OR '1'='1", "x'; DROP TABLE users; --", "\" OR \"\"=\""] {
        let rows = raw_query(
            &conn,
            "SELECT username FROM users WHERE username = ?1",
            [hostile],
            |row| row.get::<_, String>(0),
        )
        .expect("query should succeed");
        assert!(rows.is_empty(), "{hostile} should match nothing");
    }

    assert_eq!(User::query().count(&conn).expect("users table intact"), 1);
}

#[test]
fn raw_query_rejects_writes() {
    let conn = test_db();
    let err = raw_query(&conn, "DELETE FROM users", [], |row| row.get::<_, i64>(0))
        .expect_err("writes are not allowed");
    assert!(matches!(err, StoreError::NotReadOnly(_)), "{err:?}");
}

#[test]
fn raw_query_never_runs_trailing_statements() {
    let conn = test_db();
    create_user(&conn, &NewUser::new("alice", "secret")).expect("create");

    let err = raw_query(
        &conn,
        "SELECT username FROM users; DELETE FROM users",
        [],
        |row| row.get::<_, String>(0),
    )
    .expect_err("trailing statements are refused");
    assert!(
        matches!(err, StoreError::Database(rusqlite::Error::MultipleStatement)),
        "{err:?}"
    );
    assert_eq!(User::query().count(&conn).expect("count"), 1);
}

#[test]
fn exec_returns_affected_rows() {
    let conn = test_db();
    create_user(&conn, &user_with_notes("alice", 3)).expect("create");

    let affected = exec(
        &conn,
        "UPDATE notes SET content = ?1, updated_at = datetime('now') WHERE name <> ?2",
        ["edited", "note 1"],
    )
    .expect("update should succeed");
    assert_eq!(affected, 2);

    let edited = Note::query()
        .filter(Filter::eq("content", "edited"))
        .count(&conn)
        .expect("count");
    assert_eq!(edited, 2);
}

// ── reports ─────────────────────────────────────────────────────────

#[test]
fn note_count_report_applies_threshold() {
    let conn = test_db();
    create_user(&conn, &user_with_notes("alice", 3)).expect("create");
    create_user(&conn, &user_with_notes("bob", 2)).expect("create");
    create_user(&conn, &user_with_notes("carol", 4)).expect("create");

    let rows = users_with_more_notes_than(&conn, 2).expect("report");
    let summary: Vec<(&str, i64)> = rows
        .iter()
        .map(|r| (r.username.as_str(), r.note_count))
        .collect();
    assert_eq!(summary, [("alice", 3), ("carol", 4)]);
}

#[test]
fn left_join_reports_missing_cards_as_none() {
    let conn = test_db();
    create_user(&conn, &NewUser::new("alice", "1").with_credit_card("4111-1")).expect("create");
    create_user(&conn, &NewUser::new("bob", "2")).expect("create");

    let rows = user_cards(&conn).expect("report");
    assert_eq!(
        rows,
        vec![
            UserCard {
                username: "alice".to_string(),
                card_number: Some("4111-1".to_string()),
            },
            UserCard {
                username: "bob".to_string(),
                card_number: None,
            },
        ]
    );
}
