//! Channel transport providers
//!
//! The messaging channel itself lives in an external gateway process; this
//! module is the client side of that gateway. Inbound traffic arrives via
//! the `/api/channel/event` webhook, so providers only cover the outbound
//! half: opening a session, sending messages, and tearing down.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Result of asking the gateway to open a session
#[derive(Debug, Clone, PartialEq)]
pub enum Handshake {
    /// Session restored from stored credentials, no pairing needed
    Connected,
    /// The user must scan/enter this code to pair a device
    PairingChallenge(String),
}

/// Errors from the channel transport
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway error: {0}")]
    Gateway(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait defining the interface for channel transports
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Open (or resume) a channel session
    async fn connect(&self) -> ProviderResult<Handshake>;

    /// Send a text message to a channel recipient
    async fn send_message(&self, to: &str, text: &str) -> ProviderResult<()>;

    /// Tear down the channel session
    async fn disconnect(&self) -> ProviderResult<()>;
}

/// Concrete provider enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ChannelClient {
    /// HTTP gateway process (e.g. a WhatsApp bridge)
    Gateway(GatewayProvider),
    /// Mock provider for testing
    Mock(MockProvider),
}

impl ChannelClient {
    /// Create a provider from environment variables
    ///
    /// Returns None when `TALLY_GATEWAY_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("TALLY_GATEWAY_URL").ok()?;
        Some(ChannelClient::Gateway(GatewayProvider::new(&url)))
    }

    /// Create a mock provider for testing
    pub fn mock() -> Self {
        ChannelClient::Mock(MockProvider::new())
    }
}

#[async_trait]
impl ChannelProvider for ChannelClient {
    async fn connect(&self) -> ProviderResult<Handshake> {
        match self {
            ChannelClient::Gateway(p) => p.connect().await,
            ChannelClient::Mock(p) => p.connect().await,
        }
    }

    async fn send_message(&self, to: &str, text: &str) -> ProviderResult<()> {
        match self {
            ChannelClient::Gateway(p) => p.send_message(to, text).await,
            ChannelClient::Mock(p) => p.send_message(to, text).await,
        }
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        match self {
            ChannelClient::Gateway(p) => p.disconnect().await,
            ChannelClient::Mock(p) => p.disconnect().await,
        }
    }
}

/// HTTP client for the channel gateway process
#[derive(Clone)]
pub struct GatewayProvider {
    http_client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    /// "connected" or "pairing"
    status: String,
    #[serde(default)]
    pairing_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl GatewayProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChannelProvider for GatewayProvider {
    async fn connect(&self) -> ProviderResult<Handshake> {
        let response = self
            .http_client
            .post(format!("{}/session/connect", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        let body: ConnectResponse = response.json().await?;
        if let Some(err) = body.error {
            return Err(ProviderError::Gateway(err));
        }

        match body.status.as_str() {
            "connected" => Ok(Handshake::Connected),
            "pairing" => {
                let code = body
                    .pairing_code
                    .ok_or_else(|| ProviderError::Gateway("pairing without code".to_string()))?;
                Ok(Handshake::PairingChallenge(code))
            }
            other => Err(ProviderError::Gateway(format!(
                "Unexpected session status: {}",
                other
            ))),
        }
    }

    async fn send_message(&self, to: &str, text: &str) -> ProviderResult<()> {
        self.http_client
            .post(format!("{}/messages/send", self.base_url))
            .json(&SendRequest { to, text })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        self.http_client
            .post(format!("{}/session/disconnect", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Mock provider for testing
///
/// Records outbound messages and can be scripted to return pairing
/// challenges or failures.
#[derive(Clone, Default)]
pub struct MockProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Handshake results, popped per connect() call; empty means Connected
    handshakes: VecDeque<Handshake>,
    /// Messages sent through this provider
    sent: Vec<(String, String)>,
    /// When true, send_message fails
    fail_sends: bool,
    connect_calls: usize,
    disconnect_calls: usize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next connect() to return a pairing challenge
    pub fn with_pairing(code: &str) -> Self {
        let provider = Self::default();
        provider
            .inner
            .lock()
            .unwrap()
            .handshakes
            .push_back(Handshake::PairingChallenge(code.to_string()));
        provider
    }

    /// Make all send_message calls fail
    pub fn fail_sends(&self) {
        self.inner.lock().unwrap().fail_sends = true;
    }

    /// Messages sent so far as (to, text) pairs
    pub fn sent(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.inner.lock().unwrap().connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.inner.lock().unwrap().disconnect_calls
    }
}

#[async_trait]
impl ChannelProvider for MockProvider {
    async fn connect(&self) -> ProviderResult<Handshake> {
        let mut state = self.inner.lock().unwrap();
        state.connect_calls += 1;
        Ok(state.handshakes.pop_front().unwrap_or(Handshake::Connected))
    }

    async fn send_message(&self, to: &str, text: &str) -> ProviderResult<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_sends {
            return Err(ProviderError::Gateway("mock send failure".to_string()));
        }
        state.sent.push((to.to_string(), text.to_string()));
        Ok(())
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        self.inner.lock().unwrap().disconnect_calls += 1;
        Ok(())
    }
}
