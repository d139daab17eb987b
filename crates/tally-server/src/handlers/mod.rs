//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod alerts;
pub mod channel;
pub mod messages;
pub mod reminders;
pub mod transactions;

// Re-export all handlers for use in router
pub use alerts::*;
pub use channel::*;
pub use messages::*;
pub use reminders::*;
pub use transactions::*;

use serde::Deserialize;

/// Common query parameter selecting whose data to read
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}
