//! Background reminder scheduler
//!
//! Ticks on a fixed interval, sweeping reminders that entered their
//! notification window: marks past-due reminders overdue, notifies owners
//! over the channel, and records notification times so a reminder is not
//! re-announced within the dedup window.
//!
//! Ticks are non-reentrant (a slow tick causes the next one to be skipped)
//! and the whole scheduler stops promptly via its handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info, warn};

use tally_core::{Database, Reminder, ReminderStatus, Settings};

use crate::broadcast::{EventBroadcaster, WireEvent};
use crate::notify::{DispatchError, NotificationDispatcher};

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
}

impl SchedulerHandle {
    /// Stop the scheduler. Idempotent; a tick in progress finishes first.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Start the reminder scheduler as a background task
pub fn start_reminder_scheduler(
    db: Database,
    dispatcher: NotificationDispatcher,
    broadcaster: Arc<EventBroadcaster>,
    settings: Settings,
) -> SchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let tick_interval = settings.tick_interval;

    info!(
        "Starting reminder scheduler: tick every {}s, dedup window {}h",
        tick_interval.as_secs(),
        settings.dedup_window.num_hours()
    );

    tokio::spawn(async move {
        let tick_running = AtomicBool::new(false);
        let mut ticker = interval(tick_interval);
        // The first interval tick fires immediately; that initial sweep is
        // wanted so restarts don't delay overdue notifications.
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if tick_running.swap(true, Ordering::SeqCst) {
                        warn!("Previous reminder tick still running, skipping");
                        continue;
                    }
                    if let Err(e) = run_tick(&db, &dispatcher, &broadcaster, &settings, Utc::now()).await {
                        error!(error = %e, "Reminder tick failed");
                    }
                    tick_running.store(false, Ordering::SeqCst);
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Reminder scheduler stopped");
                        break;
                    }
                }
            }
        }
    });

    SchedulerHandle {
        shutdown: shutdown_tx,
    }
}

/// One scheduler sweep at the given instant.
///
/// Separated from the loop so tests can drive time explicitly.
pub async fn run_tick(
    db: &Database,
    dispatcher: &NotificationDispatcher,
    broadcaster: &EventBroadcaster,
    settings: &Settings,
    now: DateTime<Utc>,
) -> tally_core::Result<()> {
    let due = db.list_due_reminders(now)?;

    for reminder in due {
        // Dedup first: a reminder the owner heard about recently is left
        // completely alone until the window elapses
        if let Some(last) = reminder.last_notified_at {
            if now - last < settings.dedup_window {
                continue;
            }
        }

        let reminder = if reminder.due_at < now && reminder.status == ReminderStatus::Pending {
            let updated = db.update_reminder_status(reminder.id, ReminderStatus::Overdue)?;
            broadcaster
                .broadcast(
                    &updated.owner_id,
                    &WireEvent::new("reminder_overdue", serde_json::to_value(&updated)?),
                )
                .await;
            updated
        } else {
            reminder
        };

        if !reminder.notify_via_channel {
            continue;
        }

        let text = notification_text(&reminder, now);
        match dispatcher.send(&reminder.owner_id, &text).await {
            Ok(()) => {
                // CAS write: a concurrent sweep that already notified wins
                if db.set_reminder_notified(reminder.id, now)? {
                    info!(id = reminder.id, owner = %reminder.owner_id, "Reminder notification sent");
                }
            }
            Err(DispatchError::NotConnected) => {
                // No retry here; the next tick picks it up once connected
                warn!(id = reminder.id, "Channel not connected, reminder notification skipped");
            }
            Err(e) => {
                warn!(id = reminder.id, error = %e, "Reminder notification failed");
            }
        }
    }

    Ok(())
}

fn notification_text(reminder: &Reminder, now: DateTime<Utc>) -> String {
    let status_line = if reminder.due_at < now {
        "Overdue".to_string()
    } else {
        match (reminder.due_at - now).num_days() {
            0 => "Due today".to_string(),
            days => format!("Due in {} day(s)", days),
        }
    };

    let amount = reminder
        .amount
        .map(|a| format!(" ({:.2})", a))
        .unwrap_or_default();

    let mut text = format!(
        "{}: {}{} [{}], due {}",
        status_line,
        reminder.title,
        amount,
        reminder.category,
        reminder.due_at.format("%Y-%m-%d")
    );
    if !reminder.description.is_empty() {
        text.push_str(&format!("\n{}", reminder.description));
    }
    if reminder.recurrence.is_recurring() {
        text.push_str(&format!("\nRepeats {}", reminder.recurrence));
    }
    text
}
