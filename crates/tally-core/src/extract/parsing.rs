//! JSON parsing helpers for extraction responses
//!
//! Models often wrap the JSON payload in extra prose, so these helpers
//! locate the outermost object before deserializing.

use serde::Deserialize;

use crate::error::{Error, Result};

use super::ExtractedTransaction;

#[derive(Deserialize)]
struct ModelRefusal {
    error: String,
}

/// Shorten a model response for error messages. Cuts on a char boundary,
/// never mid-codepoint.
fn truncate(s: &str) -> String {
    match s.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Parse an extracted transaction from a model response
pub fn parse_extraction(response: &str) -> Result<ExtractedTransaction> {
    let response = response.trim();

    let start = response.find('{');
    let end = response.rfind('}');

    let json_str = match (start, end) {
        (Some(s), Some(e)) if s < e => &response[s..=e],
        _ => {
            return Err(Error::Extraction(format!(
                "No JSON found in model response | Raw: {}",
                truncate(response)
            )))
        }
    };

    // The model signals "not a transaction" with an error object
    if let Ok(refusal) = serde_json::from_str::<ModelRefusal>(json_str) {
        return Err(Error::Extraction(format!(
            "Model declined extraction: {}",
            refusal.error
        )));
    }

    let extracted: ExtractedTransaction = serde_json::from_str(json_str).map_err(|e| {
        Error::Extraction(format!(
            "Invalid JSON from model: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    if extracted.amount <= 0.0 || !extracted.amount.is_finite() {
        return Err(Error::Extraction(format!(
            "Model returned non-positive amount {}",
            extracted.amount
        )));
    }

    Ok(extracted)
}
