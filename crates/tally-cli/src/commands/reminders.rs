//! Reminder lifecycle command implementations

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use tally_core::db::Database;
use tally_core::models::{NewReminder, Recurrence, Reminder, ReminderStatus};

use super::truncate;

fn status_icon(status: ReminderStatus) -> &'static str {
    match status {
        ReminderStatus::Pending => "⏳",
        ReminderStatus::Overdue => "🚨",
        ReminderStatus::Done => "✅",
        ReminderStatus::Cancelled => "🚫",
    }
}

fn print_reminder(reminder: &Reminder) {
    let amount_str = match reminder.amount {
        Some(amount) => format!(" (${:.2})", amount),
        None => String::new(),
    };
    let recur_str = if reminder.recurrence.is_recurring() {
        format!(" ↻ {}", reminder.recurrence.as_str())
    } else {
        String::new()
    };

    println!(
        "   {} #{:<4} {} │ {}{}{}",
        status_icon(reminder.status),
        reminder.id,
        reminder.due_at.format("%Y-%m-%d"),
        truncate(&reminder.title, 40),
        amount_str,
        recur_str
    );
}

pub fn cmd_reminders_list(db: &Database, owner: &str, all: bool) -> Result<()> {
    let reminders = db.list_reminders(owner, all)?;

    if reminders.is_empty() {
        println!("No reminders for {}. Add one with:", owner);
        println!("  tally reminders add --title \"Pay rent\" --due 2026-09-01 --recur monthly");
        return Ok(());
    }

    println!();
    println!("⏰ Reminders ({})", owner);
    println!("   ─────────────────────────────────────────────────────────────");

    for reminder in reminders {
        print_reminder(&reminder);
    }

    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_reminders_add(
    db: &Database,
    owner: &str,
    title: &str,
    due: &str,
    amount: Option<f64>,
    category: &str,
    recur: &str,
    lead_days: Option<i64>,
    no_notify: bool,
) -> Result<()> {
    let due_date = NaiveDate::parse_from_str(due, "%Y-%m-%d")
        .context("Invalid --due date format (use YYYY-MM-DD)")?;
    let due_at = Utc
        .from_utc_datetime(&due_date.and_hms_opt(0, 0, 0).context("Invalid due date")?);

    let recurrence: Recurrence = recur.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let reminder = db.create_reminder(&NewReminder {
        owner_id: owner.to_string(),
        title: title.to_string(),
        description: String::new(),
        amount,
        category: category.to_string(),
        due_at,
        recurrence,
        notify_via_channel: !no_notify,
        lead_days,
    })?;

    println!("✅ Created reminder #{}:", reminder.id);
    print_reminder(&reminder);
    Ok(())
}

pub fn cmd_reminders_complete(db: &Database, id: i64) -> Result<()> {
    let (done, next) = db.complete_reminder(id)?;

    println!("✅ Completed reminder #{}: {}", done.id, done.title);
    if let Some(next) = next {
        println!(
            "   ↻ Next occurrence #{} due {}",
            next.id,
            next.due_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub fn cmd_reminders_cancel(db: &Database, id: i64) -> Result<()> {
    let reminder = db.cancel_reminder(id)?;
    println!("🚫 Cancelled reminder #{}: {}", reminder.id, reminder.title);
    Ok(())
}
