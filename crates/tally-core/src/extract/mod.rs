//! Pluggable transaction extraction backend
//!
//! Turns free-form natural language ("Spent 45 on groceries") into a
//! structured transaction via a local LLM.
//!
//! - `ExtractionBackend` trait: the interface every backend implements
//! - `ExtractorClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaExtractor`, `OpenAICompatibleExtractor`, `MockExtractor`
//!
//! # Configuration
//!
//! Environment variables:
//! - `TALLY_EXTRACTOR`: Backend to use (ollama, openai_compatible, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;

pub use mock::MockExtractor;
pub use ollama::OllamaExtractor;
pub use openai_compatible::OpenAICompatibleExtractor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::TransactionKind;

/// Structured output of the extraction service
///
/// Category and description are optional; the pipeline fills in defaults
/// ("Other", the raw message text) when the model omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTransaction {
    pub kind: TransactionKind,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Build the extraction prompt for a message
pub(crate) fn extraction_prompt(text: &str) -> String {
    format!(
        r#"You extract financial transactions from short chat messages.

Message: "{}"

Respond with ONLY a JSON object, no other text:
{{"kind": "expense" or "income", "amount": <positive number>, "category": "<one of: Food, Transport, Housing, Health, Leisure, Shopping, Salary, Other>", "description": "<short description>"}}

If the message does not describe a financial transaction, respond with:
{{"error": "not a transaction"}}"#,
        text
    )
}

/// Trait defining the interface for extraction backends
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Extract a structured transaction from free-form text
    async fn extract(&self, text: &str) -> Result<ExtractedTransaction>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete extractor enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ExtractorClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaExtractor),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleExtractor),
    /// Mock backend for testing
    Mock(MockExtractor),
}

impl ExtractorClient {
    /// Create an extractor from environment variables
    ///
    /// Checks `TALLY_EXTRACTOR` to determine which backend to use.
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("TALLY_EXTRACTOR").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaExtractor::from_env().map(ExtractorClient::Ollama),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleExtractor::from_env().map(ExtractorClient::OpenAICompatible)
            }
            "mock" => Some(ExtractorClient::Mock(MockExtractor::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown TALLY_EXTRACTOR, falling back to ollama");
                OllamaExtractor::from_env().map(ExtractorClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        ExtractorClient::Ollama(OllamaExtractor::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        ExtractorClient::Mock(MockExtractor::new())
    }
}

#[async_trait]
impl ExtractionBackend for ExtractorClient {
    async fn extract(&self, text: &str) -> Result<ExtractedTransaction> {
        match self {
            ExtractorClient::Ollama(b) => b.extract(text).await,
            ExtractorClient::OpenAICompatible(b) => b.extract(text).await,
            ExtractorClient::Mock(b) => b.extract(text).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ExtractorClient::Ollama(b) => b.health_check().await,
            ExtractorClient::OpenAICompatible(b) => b.health_check().await,
            ExtractorClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ExtractorClient::Ollama(b) => b.model(),
            ExtractorClient::OpenAICompatible(b) => b.model(),
            ExtractorClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ExtractorClient::Ollama(b) => b.host(),
            ExtractorClient::OpenAICompatible(b) => b.host(),
            ExtractorClient::Mock(b) => b.host(),
        }
    }
}
