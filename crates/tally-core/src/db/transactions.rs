//! Transaction operations and monthly summary

use chrono::{Datelike, Utc};
use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{MonthlySummary, NewTransaction, Transaction};

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or(crate::models::TransactionKind::Expense),
        amount: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        occurred_at: parse_datetime(&row.get::<_, String>(6)?),
        source: row.get::<_, String>(7)?.parse().unwrap_or_default(),
        raw_text: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

const TRANSACTION_COLUMNS: &str =
    "id, owner_id, kind, amount, category, description, occurred_at, source, raw_text, created_at";

impl Database {
    /// Record a transaction. Amounts must be strictly positive; direction is
    /// carried by `kind`, not by sign.
    pub fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        if new.amount <= 0.0 || !new.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "Transaction amount must be positive, got {}",
                new.amount
            )));
        }

        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            r#"
            INSERT INTO transactions (owner_id, kind, amount, category, description, occurred_at, source, raw_text, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                new.owner_id,
                new.kind.as_str(),
                new.amount,
                new.category,
                new.description,
                new.occurred_at.to_rfc3339(),
                new.source.as_str(),
                new.raw_text,
                now.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.get_transaction(id)
    }

    /// Get a single transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM transactions WHERE id = ?",
                TRANSACTION_COLUMNS
            ),
            params![id],
            row_to_transaction,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                Error::NotFound(format!("Transaction {} not found", id))
            }
            e => e.into(),
        })
    }

    /// List the most recent transactions for an owner, newest first
    pub fn list_recent_transactions(&self, owner_id: &str, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE owner_id = ? ORDER BY occurred_at DESC, id DESC LIMIT ?",
            TRANSACTION_COLUMNS
        ))?;

        let rows = stmt.query_map(params![owner_id, limit], row_to_transaction)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Delete a transaction
    pub fn delete_transaction(&self, owner_id: &str, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND owner_id = ?",
            params![id, owner_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }

    /// Delete all transactions for an owner. Returns the number removed.
    pub fn clear_transactions(&self, owner_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "DELETE FROM transactions WHERE owner_id = ?",
            params![owner_id],
        )?)
    }

    /// Income/expense/balance totals for the current calendar month (UTC)
    pub fn monthly_summary(&self, owner_id: &str) -> Result<MonthlySummary> {
        let now = Utc::now();
        self.monthly_summary_at(owner_id, now.year(), now.month())
    }

    /// Totals for a specific calendar month
    pub fn monthly_summary_at(
        &self,
        owner_id: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary> {
        let conn = self.conn()?;
        let period = format!("{:04}-{:02}", year, month);

        let (income, expense): (f64, f64) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0)
            FROM transactions
            WHERE owner_id = ? AND strftime('%Y-%m', occurred_at) = ?
            "#,
            params![owner_id, period],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(MonthlySummary {
            period,
            income,
            expense,
            balance: income - expense,
        })
    }
}
