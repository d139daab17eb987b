//! Domain models for tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction source - which surface created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Reported through the messaging channel
    #[default]
    Channel,
    /// Entered through the chat surface
    Chat,
    /// Manually entered
    Manual,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Chat => "chat",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "channel" => Ok(Self::Channel),
            "chat" => Ok(Self::Chat),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial transaction reported by an owner
///
/// Immutable once created, except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// The channel identity that reported this transaction
    pub owner_id: String,
    pub kind: TransactionKind,
    /// Always positive; direction is carried by `kind`
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub source: TransactionSource,
    /// The raw message text the transaction was extracted from
    pub raw_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A new transaction before insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub owner_id: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub source: TransactionSource,
    pub raw_text: Option<String>,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "danger" => Ok(Self::Danger),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending alert produced by the rule engine
///
/// The only permitted mutation after creation is setting the read flag,
/// which is one-way false -> true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub owner_id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A new alert before insertion (rule engine output)
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Reminder recurrence interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Unknown recurrence: {}", s)),
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reminder lifecycle status
///
/// Transitions are monotonic per entity: pending -> overdue -> done/cancelled.
/// Done and cancelled are terminal; a recurring reminder that completes spawns
/// a fresh pending entity rather than mutating the completed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    #[default]
    Pending,
    Overdue,
    Done,
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "overdue" => Ok(Self::Overdue),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown reminder status: {}", s)),
        }
    }
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A due-date reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub amount: Option<f64>,
    pub category: String,
    pub due_at: DateTime<Utc>,
    pub recurrence: Recurrence,
    /// Whether the scheduler should notify through the messaging channel
    pub notify_via_channel: bool,
    /// Days before due_at at which notifications start
    pub lead_days: i64,
    pub status: ReminderStatus,
    /// Once set, only advances forward in time
    pub last_notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A new reminder before insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: Option<f64>,
    #[serde(default = "default_category")]
    pub category: String,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default = "default_true")]
    pub notify_via_channel: bool,
    pub lead_days: Option<i64>,
}

fn default_category() -> String {
    "Other".to_string()
}

fn default_true() -> bool {
    true
}

/// Current-month totals, derived on demand from transactions (never stored)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    /// Period label, e.g. "2026-08"
    pub period: String,
}
