//! Alert rule engine
//!
//! Pure evaluation over the recent transaction window and the current
//! monthly summary. The engine keeps no state: the same condition re-fires
//! on every qualifying evaluation, and read-tracking lives entirely with the
//! persisted alerts.

use crate::models::{MonthlySummary, NewAlert, Severity, Transaction, TransactionKind};

/// Configurable rule thresholds
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    /// A single expense above this amount triggers a warning
    pub high_expense: f64,
    /// Monthly expense total above this amount triggers a danger alert
    pub monthly_limit: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            high_expense: 1000.0,
            monthly_limit: 5000.0,
        }
    }
}

/// Balance/income ratio above which the savings-rate alert fires
const SAVINGS_RATE_FLOOR: f64 = 0.30;

/// Evaluate alert rules against recent transactions and the monthly summary
pub fn evaluate(
    recent: &[Transaction],
    summary: &MonthlySummary,
    thresholds: &AlertThresholds,
) -> Vec<NewAlert> {
    let mut alerts = Vec::new();

    let high_expenses = recent
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense && t.amount > thresholds.high_expense)
        .count();
    if high_expenses > 0 {
        alerts.push(NewAlert {
            severity: Severity::Warning,
            title: "High expense detected".to_string(),
            message: format!(
                "{} expense(s) above {:.2} in your recent transactions",
                high_expenses, thresholds.high_expense
            ),
        });
    }

    if summary.expense > thresholds.monthly_limit {
        alerts.push(NewAlert {
            severity: Severity::Danger,
            title: "Monthly limit exceeded".to_string(),
            message: format!(
                "Spent {:.2} this month, over your {:.2} limit",
                summary.expense, thresholds.monthly_limit
            ),
        });
    }

    if summary.balance < 0.0 {
        alerts.push(NewAlert {
            severity: Severity::Danger,
            title: "Negative balance".to_string(),
            message: format!("Your balance this month is {:.2}", summary.balance),
        });
    }

    if summary.balance > 0.0 && summary.income > 0.0 {
        let rate = summary.balance / summary.income;
        if rate > SAVINGS_RATE_FLOOR {
            alerts.push(NewAlert {
                severity: Severity::Info,
                title: "Good savings rate".to_string(),
                message: format!("You are saving {:.0}% of your income this month", rate * 100.0),
            });
        }
    }

    alerts
}
