//! Reminder lifecycle: due scan, status transitions, notification bookkeeping,
//! and the recurrence fork on completion.

use chrono::{DateTime, Days, Months, Utc};
use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewReminder, Recurrence, Reminder, ReminderStatus};

fn row_to_reminder(row: &rusqlite::Row) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        category: row.get(5)?,
        due_at: parse_datetime(&row.get::<_, String>(6)?),
        recurrence: row.get::<_, String>(7)?.parse().unwrap_or(Recurrence::None),
        notify_via_channel: row.get(8)?,
        lead_days: row.get(9)?,
        status: row
            .get::<_, String>(10)?
            .parse()
            .unwrap_or(ReminderStatus::Pending),
        last_notified_at: row
            .get::<_, Option<String>>(11)?
            .map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

const REMINDER_COLUMNS: &str = "id, owner_id, title, description, amount, category, due_at, \
     recurrence, notify_via_channel, lead_days, status, last_notified_at, created_at";

/// Advance a due date by one recurrence interval.
///
/// Calendar-aware: monthly from Jan 31 lands on the last day of February.
fn next_due(due_at: DateTime<Utc>, recurrence: Recurrence) -> Option<DateTime<Utc>> {
    match recurrence {
        Recurrence::None => None,
        Recurrence::Daily => due_at.checked_add_days(Days::new(1)),
        Recurrence::Weekly => due_at.checked_add_days(Days::new(7)),
        Recurrence::Monthly => due_at.checked_add_months(Months::new(1)),
        Recurrence::Yearly => due_at.checked_add_months(Months::new(12)),
    }
}

impl Database {
    /// Create a reminder
    pub fn create_reminder(&self, new: &NewReminder) -> Result<Reminder> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            r#"
            INSERT INTO reminders (owner_id, title, description, amount, category, due_at,
                                   recurrence, notify_via_channel, lead_days, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
            params![
                new.owner_id,
                new.title,
                new.description,
                new.amount,
                new.category,
                new.due_at.to_rfc3339(),
                new.recurrence.as_str(),
                new.notify_via_channel,
                new.lead_days.unwrap_or(3),
                now.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.get_reminder(id)
    }

    /// Get a single reminder by id
    pub fn get_reminder(&self, id: i64) -> Result<Reminder> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM reminders WHERE id = ?", REMINDER_COLUMNS),
            params![id],
            row_to_reminder,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                Error::NotFound(format!("Reminder {} not found", id))
            }
            e => e.into(),
        })
    }

    /// List reminders for an owner, soonest due first
    pub fn list_reminders(&self, owner_id: &str, include_terminal: bool) -> Result<Vec<Reminder>> {
        let conn = self.conn()?;

        let sql = if include_terminal {
            format!(
                "SELECT {} FROM reminders WHERE owner_id = ? ORDER BY due_at ASC, id ASC",
                REMINDER_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM reminders WHERE owner_id = ? AND status IN ('pending', 'overdue') \
                 ORDER BY due_at ASC, id ASC",
                REMINDER_COLUMNS
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], row_to_reminder)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Live reminders inside their notification window at `now`: already past
    /// due, or within `lead_days` of the due date.
    pub fn list_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reminders \
             WHERE status IN ('pending', 'overdue') \
             AND datetime(due_at, '-' || lead_days || ' days') <= datetime(?) \
             ORDER BY due_at ASC, id ASC",
            REMINDER_COLUMNS
        ))?;

        let rows = stmt.query_map(params![now.to_rfc3339()], row_to_reminder)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Transition a reminder's status.
    ///
    /// Terminal states (done, cancelled) cannot be left. Setting the current
    /// status again is a no-op, so the pending -> overdue sweep is idempotent.
    pub fn update_reminder_status(&self, id: i64, status: ReminderStatus) -> Result<Reminder> {
        let current = self.get_reminder(id)?;

        if current.status.is_terminal() {
            return Err(Error::InvalidData(format!(
                "Reminder {} is {} and cannot change to {}",
                id, current.status, status
            )));
        }
        if current.status == status {
            return Ok(current);
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE reminders SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;

        self.get_reminder(id)
    }

    /// Record that a notification went out, compare-and-set style: the write
    /// only lands if it advances `last_notified_at`. Returns whether it did.
    pub fn set_reminder_notified(&self, id: i64, notified_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE reminders SET last_notified_at = ? \
             WHERE id = ? AND (last_notified_at IS NULL OR datetime(last_notified_at) < datetime(?))",
            params![notified_at.to_rfc3339(), id, notified_at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Mark a reminder done. If it recurs, fork a fresh pending reminder one
    /// interval later and return it alongside the completed one.
    pub fn complete_reminder(&self, id: i64) -> Result<(Reminder, Option<Reminder>)> {
        let done = self.update_reminder_status(id, ReminderStatus::Done)?;

        let next = match next_due(done.due_at, done.recurrence) {
            Some(due_at) => {
                let fork = NewReminder {
                    owner_id: done.owner_id.clone(),
                    title: done.title.clone(),
                    description: done.description.clone(),
                    amount: done.amount,
                    category: done.category.clone(),
                    due_at,
                    recurrence: done.recurrence,
                    notify_via_channel: done.notify_via_channel,
                    lead_days: Some(done.lead_days),
                };
                Some(self.create_reminder(&fork)?)
            }
            None => None,
        };

        Ok((done, next))
    }

    /// Cancel a reminder
    pub fn cancel_reminder(&self, id: i64) -> Result<Reminder> {
        self.update_reminder_status(id, ReminderStatus::Cancelled)
    }
}
