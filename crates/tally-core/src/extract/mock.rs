//! Mock backend for testing
//!
//! Extracts transactions with simple keyword heuristics so tests and local
//! development work without a running LLM server.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::TransactionKind;

use super::{ExtractedTransaction, ExtractionBackend};

/// Mock extraction backend
///
/// By default it parses the first number in the message as the amount and
/// guesses kind and category from keywords. Tests can pin a fixed response
/// or force failures.
#[derive(Clone, Default)]
pub struct MockExtractor {
    /// Whether health_check should return true
    pub healthy: bool,
    /// When set, every extraction returns this instead of the heuristic
    fixed: Option<ExtractedTransaction>,
    /// When true, every extraction fails
    failing: bool,
}

impl MockExtractor {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            fixed: None,
            failing: false,
        }
    }

    /// Create a mock that fails every extraction
    pub fn failing() -> Self {
        Self {
            healthy: true,
            fixed: None,
            failing: true,
        }
    }

    /// Create a mock that always returns the given transaction
    pub fn with_response(response: ExtractedTransaction) -> Self {
        Self {
            healthy: true,
            fixed: Some(response),
            failing: false,
        }
    }

    fn first_amount(text: &str) -> Option<f64> {
        let mut current = String::new();
        for ch in text.chars() {
            if ch.is_ascii_digit() || (ch == '.' && !current.is_empty()) {
                current.push(ch);
            } else if !current.is_empty() {
                break;
            }
        }
        current.parse().ok().filter(|a| *a > 0.0)
    }

    fn guess(text: &str) -> (TransactionKind, &'static str) {
        let lower = text.to_lowercase();

        let income_words = ["received", "salary", "paycheck", "earned", "got paid"];
        if income_words.iter().any(|w| lower.contains(w)) {
            return (TransactionKind::Income, "Salary");
        }

        let category = if lower.contains("grocer") || lower.contains("lunch") || lower.contains("dinner") || lower.contains("restaurant") {
            "Food"
        } else if lower.contains("uber") || lower.contains("gas") || lower.contains("bus") || lower.contains("taxi") {
            "Transport"
        } else if lower.contains("rent") || lower.contains("electric") {
            "Housing"
        } else if lower.contains("pharmacy") || lower.contains("doctor") {
            "Health"
        } else if lower.contains("movie") || lower.contains("game") {
            "Leisure"
        } else {
            "Other"
        };

        (TransactionKind::Expense, category)
    }
}

#[async_trait]
impl ExtractionBackend for MockExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractedTransaction> {
        if self.failing {
            return Err(Error::Extraction("mock extraction failure".to_string()));
        }
        if let Some(ref fixed) = self.fixed {
            return Ok(fixed.clone());
        }

        let amount = Self::first_amount(text).ok_or_else(|| {
            Error::Extraction(format!("No amount found in message: {}", text))
        })?;
        let (kind, category) = Self::guess(text);

        Ok(ExtractedTransaction {
            kind,
            amount,
            category: Some(category.to_string()),
            description: Some(text.trim().to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
