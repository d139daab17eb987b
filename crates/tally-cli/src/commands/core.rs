//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `default_db_path` - Resolve the platform default database location
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::db::Database;

/// Default database location: platform data directory, falling back to the
/// current directory when no data directory is available
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tally").join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("tally.db"))
}

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Start the server: tally serve");
    println!("  2. Pair a messaging channel via the dashboard, or just chat:");
    println!("     curl -X POST localhost:3000/api/messages \\");
    println!("       -H 'Content-Type: application/json' \\");
    println!("       -d '{{\"owner_id\": \"local\", \"text\": \"spent 45 on groceries\"}}'");

    Ok(())
}
