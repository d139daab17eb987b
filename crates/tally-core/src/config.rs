//! Runtime configuration
//!
//! All knobs are resolved from `TALLY_*` environment variables once at
//! startup and injected into the components that need them; nothing reads
//! the environment after construction.
//!
//! - `TALLY_ALLOWED_SENDERS`: comma-separated channel identities permitted
//!   to report transactions (everyone else is silently dropped)
//! - `TALLY_RECONNECT_BACKOFF_SECS`: delay before an automatic reconnect
//!   attempt after a transient channel drop (default: 10)
//! - `TALLY_TICK_INTERVAL_MINS`: reminder scheduler cadence (default: 30)
//! - `TALLY_DEDUP_WINDOW_HOURS`: minimum gap between repeat notifications
//!   for the same reminder (default: 12)
//! - `TALLY_HIGH_EXPENSE_THRESHOLD`: single-expense warning threshold
//!   (default: 1000.0)
//! - `TALLY_MONTHLY_LIMIT`: monthly expense limit (default: 5000.0)
//! - `TALLY_DEFAULT_LEAD_DAYS`: notification window for new reminders
//!   (default: 3)

use std::collections::HashSet;
use std::time::Duration;

use crate::rules::AlertThresholds;

/// How many recent transactions the rule engine sees per evaluation.
pub const RECENT_WINDOW: i64 = 30;

/// Process-wide configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    /// Channel identities allowed to trigger ingestion
    pub allowed_senders: HashSet<String>,
    /// Backoff before automatic reconnect after a transient drop
    pub reconnect_backoff: Duration,
    /// Reminder scheduler tick interval
    pub tick_interval: Duration,
    /// Minimum gap before re-notifying the same reminder
    pub dedup_window: chrono::Duration,
    /// Alert rule thresholds
    pub thresholds: AlertThresholds,
    /// Lead days applied to new reminders that do not specify one
    pub default_lead_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowed_senders: HashSet::new(),
            reconnect_backoff: Duration::from_secs(10),
            tick_interval: Duration::from_secs(30 * 60),
            dedup_window: chrono::Duration::hours(12),
            thresholds: AlertThresholds::default(),
            default_lead_days: 3,
        }
    }
}

impl Settings {
    /// Resolve configuration from `TALLY_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allowed_senders = std::env::var("TALLY_ALLOWED_SENDERS")
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let reconnect_backoff = env_u64("TALLY_RECONNECT_BACKOFF_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.reconnect_backoff);

        let tick_interval = env_u64("TALLY_TICK_INTERVAL_MINS")
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or(defaults.tick_interval);

        let dedup_window = env_u64("TALLY_DEDUP_WINDOW_HOURS")
            .map(|h| chrono::Duration::hours(h as i64))
            .unwrap_or(defaults.dedup_window);

        let thresholds = AlertThresholds {
            high_expense: env_f64("TALLY_HIGH_EXPENSE_THRESHOLD")
                .unwrap_or(defaults.thresholds.high_expense),
            monthly_limit: env_f64("TALLY_MONTHLY_LIMIT")
                .unwrap_or(defaults.thresholds.monthly_limit),
        };

        let default_lead_days =
            env_u64("TALLY_DEFAULT_LEAD_DAYS").map(|d| d as i64).unwrap_or(defaults.default_lead_days);

        Self {
            allowed_senders,
            reconnect_backoff,
            tick_interval,
            dedup_window,
            thresholds,
            default_lead_days,
        }
    }

    /// Whether a channel sender identity is allowed to trigger ingestion.
    /// An empty allow-list admits everyone (single-user local setups).
    pub fn sender_allowed(&self, sender_id: &str) -> bool {
        self.allowed_senders.is_empty() || self.allowed_senders.contains(sender_id)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
