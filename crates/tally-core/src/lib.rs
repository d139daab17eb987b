//! Tally Core Library
//!
//! Shared functionality for the Tally conversational finance tracker:
//! - Ledger access and migrations (transactions, alerts, reminders)
//! - Pluggable local LLM extraction backends (Ollama, OpenAI-compatible)
//! - Alert rule engine over recent activity and monthly totals
//! - Runtime settings resolved from the environment

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod rules;

pub use config::{Settings, RECENT_WINDOW};
pub use db::{Database, LedgerStats};
pub use error::{Error, Result};
pub use extract::{
    ExtractedTransaction, ExtractionBackend, ExtractorClient, MockExtractor, OllamaExtractor,
    OpenAICompatibleExtractor,
};
pub use models::{
    Alert, MonthlySummary, NewAlert, NewReminder, NewTransaction, Recurrence, Reminder,
    ReminderStatus, Severity, Transaction, TransactionKind, TransactionSource,
};
pub use rules::AlertThresholds;
