//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init command and shared utilities (open_db, default_db_path)
//! - `ledger` - Transaction and summary commands
//! - `reminders` - Reminder lifecycle commands
//! - `serve` - Web server command
//! - `status` - Status and alert commands

pub mod core;
pub mod ledger;
pub mod reminders;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use core::*;
pub use ledger::*;
pub use reminders::*;
pub use serve::*;
pub use status::*;

/// Truncate a string to a maximum number of chars, adding "..." if truncated.
/// Counts chars rather than bytes so accented titles don't split mid-codepoint.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
