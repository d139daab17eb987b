use chrono::{Duration, TimeZone, Utc};

use super::Database;
use crate::models::{
    NewAlert, NewReminder, NewTransaction, Recurrence, ReminderStatus, Severity, TransactionKind,
    TransactionSource,
};

fn new_transaction(owner: &str, kind: TransactionKind, amount: f64) -> NewTransaction {
    NewTransaction {
        owner_id: owner.to_string(),
        kind,
        amount,
        category: "Food".to_string(),
        description: "groceries".to_string(),
        occurred_at: Utc::now(),
        source: TransactionSource::Channel,
        raw_text: Some("Spent 45 on groceries".to_string()),
    }
}

fn new_reminder(owner: &str, due_at: chrono::DateTime<Utc>, recurrence: Recurrence) -> NewReminder {
    NewReminder {
        owner_id: owner.to_string(),
        title: "Rent".to_string(),
        description: String::new(),
        amount: Some(1200.0),
        category: "Housing".to_string(),
        due_at,
        recurrence,
        notify_via_channel: true,
        lead_days: Some(3),
    }
}

#[test]
fn test_create_and_read_transaction() {
    let db = Database::in_memory().unwrap();

    let tx = db
        .create_transaction(&new_transaction("owner-1", TransactionKind::Expense, 45.0))
        .unwrap();
    assert!(tx.id > 0);
    assert_eq!(tx.amount, 45.0);
    assert_eq!(tx.kind, TransactionKind::Expense);

    let recent = db.list_recent_transactions("owner-1", 30).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, tx.id);
    assert_eq!(recent[0].description, "groceries");
    assert_eq!(recent[0].raw_text.as_deref(), Some("Spent 45 on groceries"));
}

#[test]
fn test_transaction_rejects_non_positive_amount() {
    let db = Database::in_memory().unwrap();

    for bad in [0.0, -12.5, f64::NAN] {
        let err = db
            .create_transaction(&new_transaction("owner-1", TransactionKind::Expense, bad))
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::InvalidData(_)));
    }

    assert!(db.list_recent_transactions("owner-1", 30).unwrap().is_empty());
}

#[test]
fn test_recent_transactions_are_scoped_and_limited() {
    let db = Database::in_memory().unwrap();

    for i in 0..5 {
        let mut tx = new_transaction("owner-1", TransactionKind::Expense, 10.0 + i as f64);
        tx.occurred_at = Utc::now() - Duration::hours(5 - i);
        db.create_transaction(&tx).unwrap();
    }
    db.create_transaction(&new_transaction("owner-2", TransactionKind::Income, 99.0))
        .unwrap();

    let recent = db.list_recent_transactions("owner-1", 3).unwrap();
    assert_eq!(recent.len(), 3);
    // Newest first
    assert_eq!(recent[0].amount, 14.0);
    assert!(recent.iter().all(|t| t.owner_id == "owner-1"));
}

#[test]
fn test_delete_and_clear_transactions() {
    let db = Database::in_memory().unwrap();

    let tx = db
        .create_transaction(&new_transaction("owner-1", TransactionKind::Expense, 20.0))
        .unwrap();
    db.create_transaction(&new_transaction("owner-1", TransactionKind::Income, 500.0))
        .unwrap();
    let other = db
        .create_transaction(&new_transaction("owner-2", TransactionKind::Expense, 7.0))
        .unwrap();

    db.delete_transaction("owner-1", tx.id).unwrap();
    assert!(db.delete_transaction("owner-1", tx.id).is_err());
    // Cannot delete another owner's transaction
    assert!(db.delete_transaction("owner-1", other.id).is_err());

    let removed = db.clear_transactions("owner-1").unwrap();
    assert_eq!(removed, 1);
    assert_eq!(db.list_recent_transactions("owner-2", 30).unwrap().len(), 1);
}

#[test]
fn test_monthly_summary_totals_current_month_only() {
    let db = Database::in_memory().unwrap();
    let now = Utc::now();

    db.create_transaction(&new_transaction("owner-1", TransactionKind::Income, 3000.0))
        .unwrap();
    db.create_transaction(&new_transaction("owner-1", TransactionKind::Expense, 450.0))
        .unwrap();
    db.create_transaction(&new_transaction("owner-1", TransactionKind::Expense, 50.0))
        .unwrap();

    // Last month's spending must not count
    let mut old = new_transaction("owner-1", TransactionKind::Expense, 999.0);
    old.occurred_at = now - Duration::days(45);
    db.create_transaction(&old).unwrap();

    let summary = db.monthly_summary("owner-1").unwrap();
    assert_eq!(summary.income, 3000.0);
    assert_eq!(summary.expense, 500.0);
    assert_eq!(summary.balance, 2500.0);
}

#[test]
fn test_alert_lifecycle() {
    let db = Database::in_memory().unwrap();

    let alert = db
        .create_alert(
            "owner-1",
            &NewAlert {
                severity: Severity::Warning,
                title: "High expense".to_string(),
                message: "Large purchase detected".to_string(),
            },
        )
        .unwrap();
    assert!(!alert.read);

    db.mark_alert_read("owner-1", alert.id).unwrap();
    assert!(db.list_alerts("owner-1", false).unwrap().is_empty());

    let all = db.list_alerts("owner-1", true).unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].read);

    // Marking read again is harmless; wrong owner is not found
    db.mark_alert_read("owner-1", alert.id).unwrap();
    assert!(db.mark_alert_read("owner-2", alert.id).is_err());
}

#[test]
fn test_due_reminder_scan_honors_lead_days() {
    let db = Database::in_memory().unwrap();
    let now = Utc::now();

    // Due in 2 days with a 3-day lead: in the window
    let soon = db
        .create_reminder(&new_reminder("owner-1", now + Duration::days(2), Recurrence::None))
        .unwrap();
    // Due in 10 days: not yet
    db.create_reminder(&new_reminder("owner-1", now + Duration::days(10), Recurrence::None))
        .unwrap();
    // Already past due: in the window
    let late = db
        .create_reminder(&new_reminder("owner-1", now - Duration::days(1), Recurrence::None))
        .unwrap();

    let due = db.list_due_reminders(now).unwrap();
    let ids: Vec<i64> = due.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![late.id, soon.id]);
}

#[test]
fn test_overdue_transition_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let reminder = db
        .create_reminder(&new_reminder(
            "owner-1",
            Utc::now() - Duration::days(1),
            Recurrence::None,
        ))
        .unwrap();

    let first = db
        .update_reminder_status(reminder.id, ReminderStatus::Overdue)
        .unwrap();
    let second = db
        .update_reminder_status(reminder.id, ReminderStatus::Overdue)
        .unwrap();
    assert_eq!(first.status, ReminderStatus::Overdue);
    assert_eq!(second.status, ReminderStatus::Overdue);
}

#[test]
fn test_terminal_reminders_cannot_change_status() {
    let db = Database::in_memory().unwrap();
    let reminder = db
        .create_reminder(&new_reminder("owner-1", Utc::now(), Recurrence::None))
        .unwrap();

    db.cancel_reminder(reminder.id).unwrap();
    assert!(db
        .update_reminder_status(reminder.id, ReminderStatus::Pending)
        .is_err());
    assert!(db
        .update_reminder_status(reminder.id, ReminderStatus::Done)
        .is_err());
}

#[test]
fn test_notified_timestamp_only_advances() {
    let db = Database::in_memory().unwrap();
    let reminder = db
        .create_reminder(&new_reminder("owner-1", Utc::now(), Recurrence::None))
        .unwrap();

    let t1 = Utc::now();
    let t2 = t1 + Duration::minutes(30);

    assert!(db.set_reminder_notified(reminder.id, t2).unwrap());
    // A stale write loses
    assert!(!db.set_reminder_notified(reminder.id, t1).unwrap());

    let after = db.get_reminder(reminder.id).unwrap();
    let noted = after.last_notified_at.unwrap();
    assert!((noted - t2).num_seconds().abs() <= 1);
}

#[test]
fn test_completing_recurring_reminder_forks_next_occurrence() {
    let db = Database::in_memory().unwrap();
    let due = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    let reminder = db
        .create_reminder(&new_reminder("owner-1", due, Recurrence::Monthly))
        .unwrap();

    let (done, next) = db.complete_reminder(reminder.id).unwrap();
    assert_eq!(done.status, ReminderStatus::Done);

    let next = next.expect("monthly reminder should fork");
    assert_eq!(next.status, ReminderStatus::Pending);
    assert_eq!(next.recurrence, Recurrence::Monthly);
    assert_eq!(next.title, "Rent");
    assert_eq!(
        next.due_at,
        Utc.with_ymd_and_hms(2024, 2, 15, 9, 0, 0).unwrap()
    );
    assert!(next.last_notified_at.is_none());
}

#[test]
fn test_monthly_fork_clamps_to_end_of_month() {
    let db = Database::in_memory().unwrap();
    let due = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
    let reminder = db
        .create_reminder(&new_reminder("owner-1", due, Recurrence::Monthly))
        .unwrap();

    let (_, next) = db.complete_reminder(reminder.id).unwrap();
    assert_eq!(
        next.unwrap().due_at,
        Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
    );
}

#[test]
fn test_completing_one_shot_reminder_does_not_fork() {
    let db = Database::in_memory().unwrap();
    let reminder = db
        .create_reminder(&new_reminder("owner-1", Utc::now(), Recurrence::None))
        .unwrap();

    let (done, next) = db.complete_reminder(reminder.id).unwrap();
    assert_eq!(done.status, ReminderStatus::Done);
    assert!(next.is_none());
    assert_eq!(db.list_reminders("owner-1", true).unwrap().len(), 1);
}

#[test]
fn test_soft_reset_clears_everything() {
    let db = Database::in_memory().unwrap();

    db.create_transaction(&new_transaction("owner-1", TransactionKind::Expense, 5.0))
        .unwrap();
    db.create_alert(
        "owner-1",
        &NewAlert {
            severity: Severity::Info,
            title: "t".to_string(),
            message: "m".to_string(),
        },
    )
    .unwrap();
    db.create_reminder(&new_reminder("owner-1", Utc::now(), Recurrence::None))
        .unwrap();

    db.soft_reset().unwrap();

    assert!(db.list_recent_transactions("owner-1", 30).unwrap().is_empty());
    assert!(db.list_alerts("owner-1", true).unwrap().is_empty());
    assert!(db.list_reminders("owner-1", true).unwrap().is_empty());
}
