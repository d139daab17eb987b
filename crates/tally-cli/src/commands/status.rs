//! Status and alert command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::db::Database;

use super::{open_db, truncate};

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use std::fs;
    use tally_core::db::DB_KEY_ENV;

    println!();
    println!("📊 Tally Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Try to open the database and show stats
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                if let Ok(stats) = db.ledger_stats() {
                    println!();
                    println!("   Transactions: {}", stats.transactions);
                    println!("   Pending reminders: {}", stats.pending_reminders);
                    println!("   Unread alerts: {}", stats.unread_alerts);
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_summary(db: &Database, owner: &str) -> Result<()> {
    let summary = db.monthly_summary(owner)?;

    println!();
    println!("💰 Summary for {} ({})", owner, summary.period);
    println!("   ─────────────────────────────");
    println!("   Income:   \x1b[32m+${:.2}\x1b[0m", summary.income);
    println!("   Expenses: \x1b[31m-${:.2}\x1b[0m", summary.expense);
    if summary.balance < 0.0 {
        println!("   Balance:  \x1b[31m-${:.2}\x1b[0m", summary.balance.abs());
    } else {
        println!("   Balance:  \x1b[32m${:.2}\x1b[0m", summary.balance);
    }
    println!();

    Ok(())
}

pub fn cmd_alerts(db: &Database, owner: &str, all: bool) -> Result<()> {
    let alerts = db.list_alerts(owner, all)?;

    if alerts.is_empty() {
        println!("No alerts. 🎉");
        return Ok(());
    }

    println!();
    println!("🔔 Alerts for {}", owner);
    println!("   ─────────────────────────────────────────────────────────────");

    for alert in alerts {
        let icon = match alert.severity {
            tally_core::models::Severity::Info => "💡",
            tally_core::models::Severity::Warning => "⚠️ ",
            tally_core::models::Severity::Danger => "🚨",
        };
        let read_marker = if alert.read { " (read)" } else { "" };

        println!(
            "   {} #{} {}{}",
            icon, alert.id, alert.title, read_marker
        );
        println!("      {}", truncate(&alert.message, 70));
    }

    println!();
    Ok(())
}

/// Reset the database (soft or hard)
pub fn cmd_reset(db_path: &Path, soft: bool, yes: bool, no_encrypt: bool) -> Result<()> {
    use std::fs;
    use std::io::{self, Write};

    if soft {
        // Soft reset: clear data tables but keep the file and its key
        if !db_path.exists() {
            anyhow::bail!("Database not found: {}", db_path.display());
        }

        if !yes {
            print!("⚠️  This will delete all transactions, reminders, and alerts.\n\n");
            print!("Are you sure? [y/N] ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        }

        let db = open_db(db_path, no_encrypt)?;
        db.soft_reset()?;

        println!("✅ Database soft reset complete.");
        println!("   Cleared: transactions, reminders, alerts");
    } else {
        // Hard reset: delete and re-initialize
        if !yes {
            print!("⚠️  This will DELETE the entire database and start fresh.\n\n");
            print!("Are you sure? [y/N] ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        }

        if db_path.exists() {
            fs::remove_file(db_path)
                .with_context(|| format!("Failed to delete database: {}", db_path.display()))?;
            // Also remove WAL and journal files if present
            let _ = fs::remove_file(db_path.with_extension("db-wal"));
            let _ = fs::remove_file(db_path.with_extension("db-shm"));
            let _ = fs::remove_file(db_path.with_extension("db-journal"));
        }

        super::cmd_init(db_path, no_encrypt)?;

        println!("\n✅ Database hard reset complete.");
    }

    Ok(())
}
