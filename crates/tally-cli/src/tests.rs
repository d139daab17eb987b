//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::{TimeZone, Utc};
use tally_core::db::Database;
use tally_core::models::{NewTransaction, TransactionKind, TransactionSource};

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn create_test_transaction(db: &Database, kind: TransactionKind, amount: f64) -> i64 {
    let tx = db
        .create_transaction(&NewTransaction {
            owner_id: "local".to_string(),
            kind,
            amount,
            category: "Food".to_string(),
            description: "test transaction".to_string(),
            occurred_at: Utc::now(),
            source: TransactionSource::Manual,
            raw_text: None,
        })
        .unwrap();
    tx.id
}

// ========== Shared Utility Tests ==========

#[test]
fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
}

#[test]
fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
}

#[test]
fn test_truncate_accented_string() {
    // Cuts between chars, never inside a multi-byte codepoint
    assert_eq!(truncate("não pagável até sábado à noite", 10), "não pag...");
    assert_eq!(truncate("cartão", 10), "cartão");
}

#[test]
fn test_default_db_path_ends_with_tally_db() {
    let path = commands::default_db_path();
    assert!(path.to_string_lossy().ends_with("tally.db"));
}

// ========== Transaction Command Tests ==========

#[test]
fn test_cmd_transactions_list_empty() {
    let db = setup_test_db();
    assert!(commands::cmd_transactions_list(&db, "local", 20).is_ok());
}

#[test]
fn test_cmd_transactions_list_with_data() {
    let db = setup_test_db();
    create_test_transaction(&db, TransactionKind::Expense, 45.0);
    create_test_transaction(&db, TransactionKind::Income, 2000.0);

    assert!(commands::cmd_transactions_list(&db, "local", 20).is_ok());
}

#[test]
fn test_cmd_transactions_delete() {
    let db = setup_test_db();
    let id = create_test_transaction(&db, TransactionKind::Expense, 45.0);

    assert!(commands::cmd_transactions_delete(&db, "local", id).is_ok());
    assert!(db.list_recent_transactions("local", 20).unwrap().is_empty());
}

#[test]
fn test_cmd_transactions_delete_missing() {
    let db = setup_test_db();
    assert!(commands::cmd_transactions_delete(&db, "local", 9999).is_err());
}

// ========== Summary Command Tests ==========

#[test]
fn test_cmd_summary() {
    let db = setup_test_db();
    create_test_transaction(&db, TransactionKind::Income, 2000.0);
    create_test_transaction(&db, TransactionKind::Expense, 500.0);

    assert!(commands::cmd_summary(&db, "local").is_ok());

    let summary = db.monthly_summary("local").unwrap();
    assert_eq!(summary.income, 2000.0);
    assert_eq!(summary.expense, 500.0);
    assert_eq!(summary.balance, 1500.0);
}

// ========== Reminder Command Tests ==========

#[test]
fn test_cmd_reminders_add_and_list() {
    let db = setup_test_db();

    let result = commands::cmd_reminders_add(
        &db,
        "local",
        "Pay rent",
        "2026-09-01",
        Some(1200.0),
        "Housing",
        "monthly",
        None,
        false,
    );
    assert!(result.is_ok());

    let reminders = db.list_reminders("local", false).unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].title, "Pay rent");
    assert_eq!(
        reminders[0].due_at,
        Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
    );

    assert!(commands::cmd_reminders_list(&db, "local", false).is_ok());
}

#[test]
fn test_cmd_reminders_add_bad_date() {
    let db = setup_test_db();

    let result = commands::cmd_reminders_add(
        &db,
        "local",
        "Pay rent",
        "September 1st",
        None,
        "Housing",
        "none",
        None,
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_reminders_add_bad_recurrence() {
    let db = setup_test_db();

    let result = commands::cmd_reminders_add(
        &db,
        "local",
        "Pay rent",
        "2026-09-01",
        None,
        "Housing",
        "fortnightly",
        None,
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_reminders_complete_forks_recurring() {
    let db = setup_test_db();

    commands::cmd_reminders_add(
        &db,
        "local",
        "Pay rent",
        "2026-09-01",
        Some(1200.0),
        "Housing",
        "monthly",
        None,
        false,
    )
    .unwrap();

    let id = db.list_reminders("local", false).unwrap()[0].id;
    assert!(commands::cmd_reminders_complete(&db, id).is_ok());

    // The fork is the only non-terminal reminder left
    let reminders = db.list_reminders("local", false).unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(
        reminders[0].due_at,
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_cmd_reminders_cancel() {
    let db = setup_test_db();

    commands::cmd_reminders_add(
        &db, "local", "One-off", "2026-09-15", None, "Other", "none", None, false,
    )
    .unwrap();

    let id = db.list_reminders("local", false).unwrap()[0].id;
    assert!(commands::cmd_reminders_cancel(&db, id).is_ok());
    assert!(db.list_reminders("local", false).unwrap().is_empty());
}

// ========== Reset Command Tests ==========

#[test]
fn test_cmd_reset_soft_clears_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tally.db");

    {
        let db = commands::open_db(&db_path, true).unwrap();
        create_test_transaction(&db, TransactionKind::Expense, 45.0);
    }

    assert!(commands::cmd_reset(&db_path, true, true, true).is_ok());

    let db = commands::open_db(&db_path, true).unwrap();
    assert!(db.list_recent_transactions("local", 20).unwrap().is_empty());
}

#[test]
fn test_cmd_reset_soft_missing_db() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("missing.db");

    assert!(commands::cmd_reset(&db_path, true, true, true).is_err());
}

// ========== Alert Command Tests ==========

#[test]
fn test_cmd_alerts_empty() {
    let db = setup_test_db();
    assert!(commands::cmd_alerts(&db, "local", false).is_ok());
}

#[test]
fn test_cmd_alerts_with_data() {
    use tally_core::models::{NewAlert, Severity};

    let db = setup_test_db();
    db.create_alert(
        "local",
        &NewAlert {
            severity: Severity::Warning,
            title: "High expense detected".to_string(),
            message: "Single expense of 1500.00 recorded".to_string(),
        },
    )
    .unwrap();

    assert!(commands::cmd_alerts(&db, "local", false).is_ok());
}
