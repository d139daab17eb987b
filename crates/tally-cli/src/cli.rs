//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Conversational finance tracker
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Track income and expenses by chatting with your finance bot", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Owner scope for ledger commands (a channel sender id)
    #[arg(long, default_value = "local", global = true)]
    pub owner: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server and ingestion pipeline
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires an API key from TALLY_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show database status (encryption, size, counts)
    Status,

    /// Show this month's income, expenses and balance
    Summary,

    /// Manage transactions (list, delete)
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Manage reminders (list, add, complete, cancel)
    Reminders {
        #[command(subcommand)]
        action: Option<RemindersAction>,
    },

    /// List unread alerts
    Alerts {
        /// Include alerts already marked read
        #[arg(long)]
        all: bool,
    },

    /// Reset the database (clear data)
    Reset {
        /// Soft reset: clear transactions, reminders, and alerts but keep the file
        /// Without this flag, performs a hard reset (deletes DB file and re-initializes)
        #[arg(long)]
        soft: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RemindersAction {
    /// List reminders
    List {
        /// Include done and cancelled reminders
        #[arg(long)]
        all: bool,
    },

    /// Add a reminder
    Add {
        /// Reminder title (e.g., "Pay rent")
        #[arg(short, long)]
        title: String,

        /// Due date (YYYY-MM-DD)
        #[arg(short, long)]
        due: String,

        /// Expected amount
        #[arg(short, long)]
        amount: Option<f64>,

        /// Category
        #[arg(short, long, default_value = "Other")]
        category: String,

        /// Recurrence: none, daily, weekly, monthly, yearly
        #[arg(short, long, default_value = "none")]
        recur: String,

        /// Days before the due date at which notifications start
        #[arg(long)]
        lead_days: Option<i64>,

        /// Do not notify through the messaging channel
        #[arg(long)]
        no_notify: bool,
    },

    /// Complete a reminder (recurring reminders fork the next occurrence)
    Complete {
        /// Reminder ID
        id: i64,
    },

    /// Cancel a reminder
    Cancel {
        /// Reminder ID
        id: i64,
    },
}
