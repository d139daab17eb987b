//! Alert persistence. Alerts are append-only; only the read flag mutates.

use chrono::Utc;
use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Alert, NewAlert, Severity};

fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        severity: row.get::<_, String>(2)?.parse().unwrap_or(Severity::Info),
        title: row.get(3)?,
        message: row.get(4)?,
        read: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const ALERT_COLUMNS: &str = "id, owner_id, severity, title, message, read, created_at";

impl Database {
    /// Persist a rule engine finding
    pub fn create_alert(&self, owner_id: &str, new: &NewAlert) -> Result<Alert> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO alerts (owner_id, severity, title, message, read, created_at) VALUES (?, ?, ?, ?, 0, ?)",
            params![
                owner_id,
                new.severity.as_str(),
                new.title,
                new.message,
                now.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM alerts WHERE id = ?", ALERT_COLUMNS),
            params![id],
            row_to_alert,
        )
        .map_err(Into::into)
    }

    /// List alerts for an owner, newest first
    pub fn list_alerts(&self, owner_id: &str, include_read: bool) -> Result<Vec<Alert>> {
        let conn = self.conn()?;

        let sql = if include_read {
            format!(
                "SELECT {} FROM alerts WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
                ALERT_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM alerts WHERE owner_id = ? AND read = 0 ORDER BY created_at DESC, id DESC",
                ALERT_COLUMNS
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], row_to_alert)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Mark an alert as read. One-way: there is no unread operation.
    pub fn mark_alert_read(&self, owner_id: &str, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE alerts SET read = 1 WHERE id = ? AND owner_id = ?",
            params![id, owner_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Alert {} not found", id)));
        }
        Ok(())
    }
}
