//! Channel session management
//!
//! Tracks the lifecycle of the messaging-channel session: disconnected,
//! pairing (waiting for the user to scan a code), or connected. The gateway
//! pushes lifecycle and message events to us via webhook; this module is
//! the single source of truth for session state.

pub mod provider;

pub use provider::{ChannelClient, ChannelProvider, Handshake, MockProvider, ProviderError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use tally_core::Settings;

use crate::broadcast::{EventBroadcaster, WireEvent};

/// Channel session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Pairing,
    Connected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Pairing => "pairing",
            Self::Connected => "connected",
        }
    }
}

/// Snapshot of the channel session for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub state: SessionState,
    /// Pairing code, present only while pairing
    pub pairing_code: Option<String>,
    /// When the session last reached Connected
    pub connected_at: Option<DateTime<Utc>>,
    /// Why the last connect attempt or session ended badly
    pub last_error: Option<String>,
}

/// Kind of media an inbound message arrived as. Audio is transcribed by the
/// gateway before it reaches us, so the pipeline sees text either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Text,
    Audio,
}

/// A message received from the channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel identity of the sender (becomes the owner id)
    pub sender_id: String,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub media_type: MediaType,
}

/// Lifecycle and message events pushed by the gateway webhook
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    Connected,
    Dropped {
        #[serde(default)]
        reason: String,
    },
    PairingChallenge {
        code: String,
    },
    Message(InboundMessage),
}

struct Session {
    state: SessionState,
    pairing_code: Option<String>,
    connected_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Owns the channel session state machine
///
/// `start()` is serialized: a second call while a connect attempt or pairing
/// is in flight is a no-op. An explicit `disconnect()` suppresses automatic
/// reconnection until the next `start()`.
pub struct ChannelConnectionManager {
    provider: ChannelClient,
    session: Mutex<Session>,
    /// Guards against overlapping connect attempts
    connect_in_flight: AtomicBool,
    /// Cleared by an explicit disconnect
    auto_reconnect: AtomicBool,
    settings: Settings,
    broadcaster: Arc<EventBroadcaster>,
    /// Accepted inbound messages are handed to the ingestion pipeline
    ingest_tx: mpsc::Sender<InboundMessage>,
}

impl ChannelConnectionManager {
    pub fn new(
        provider: ChannelClient,
        settings: &Settings,
        broadcaster: Arc<EventBroadcaster>,
        ingest_tx: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            provider,
            session: Mutex::new(Session {
                state: SessionState::Disconnected,
                pairing_code: None,
                connected_at: None,
                last_error: None,
            }),
            connect_in_flight: AtomicBool::new(false),
            auto_reconnect: AtomicBool::new(false),
            settings: settings.clone(),
            broadcaster,
            ingest_tx,
        }
    }

    /// Current session snapshot
    pub fn status(&self) -> ChannelStatus {
        let session = self.session.lock().unwrap();
        ChannelStatus {
            state: session.state,
            pairing_code: session.pairing_code.clone(),
            connected_at: session.connected_at,
            last_error: session.last_error.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.lock().unwrap().state == SessionState::Connected
    }

    /// Begin connecting. No-op if a connect attempt or pairing is already
    /// in flight, or the session is already connected.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        if self.connect_in_flight.swap(true, Ordering::SeqCst) {
            info!("Channel connect already in flight, ignoring start");
            return Ok(());
        }

        self.auto_reconnect.store(true, Ordering::SeqCst);

        match self.provider.connect().await {
            Ok(Handshake::Connected) => {
                self.enter_connected().await;
                Ok(())
            }
            Ok(Handshake::PairingChallenge(code)) => {
                {
                    let mut session = self.session.lock().unwrap();
                    session.state = SessionState::Pairing;
                    session.pairing_code = Some(code.clone());
                }
                info!("Channel pairing challenge issued");
                self.broadcaster
                    .broadcast_all(&WireEvent::new(
                        "pairing_challenge",
                        serde_json::json!({ "code": code }),
                    ))
                    .await;
                // Stay in-flight until the gateway reports Connected or Dropped
                Ok(())
            }
            Err(e) => {
                self.connect_in_flight.store(false, Ordering::SeqCst);
                let mut session = self.session.lock().unwrap();
                session.state = SessionState::Disconnected;
                session.pairing_code = None;
                session.last_error = Some(e.to_string());
                Err(anyhow::anyhow!("Channel connect failed: {}", e))
            }
        }
    }

    /// Explicitly tear down the session and suppress auto-reconnect
    pub async fn disconnect(self: &Arc<Self>) -> anyhow::Result<()> {
        self.auto_reconnect.store(false, Ordering::SeqCst);
        self.connect_in_flight.store(false, Ordering::SeqCst);

        if let Err(e) = self.provider.disconnect().await {
            warn!(error = %e, "Gateway disconnect failed");
        }

        {
            let mut session = self.session.lock().unwrap();
            session.state = SessionState::Disconnected;
            session.pairing_code = None;
        }
        info!("Channel disconnected by request");
        self.broadcaster
            .broadcast_all(&WireEvent::new(
                "channel_disconnected",
                serde_json::json!({ "reason": "requested" }),
            ))
            .await;
        Ok(())
    }

    /// Tear down and immediately start a fresh session
    pub async fn reconnect(self: &Arc<Self>) -> anyhow::Result<()> {
        if let Err(e) = self.provider.disconnect().await {
            warn!(error = %e, "Gateway disconnect failed during reconnect");
        }
        {
            let mut session = self.session.lock().unwrap();
            session.state = SessionState::Disconnected;
            session.pairing_code = None;
        }
        self.connect_in_flight.store(false, Ordering::SeqCst);
        self.start().await
    }

    /// Apply a gateway webhook event
    pub async fn handle_event(self: &Arc<Self>, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.enter_connected().await;
            }
            ChannelEvent::PairingChallenge { code } => {
                {
                    let mut session = self.session.lock().unwrap();
                    session.state = SessionState::Pairing;
                    session.pairing_code = Some(code.clone());
                }
                self.broadcaster
                    .broadcast_all(&WireEvent::new(
                        "pairing_challenge",
                        serde_json::json!({ "code": code }),
                    ))
                    .await;
            }
            ChannelEvent::Dropped { reason } => {
                warn!(reason = %reason, "Channel session dropped");
                {
                    let mut session = self.session.lock().unwrap();
                    session.state = SessionState::Disconnected;
                    session.pairing_code = None;
                    session.last_error = Some(reason.clone());
                }
                self.connect_in_flight.store(false, Ordering::SeqCst);
                self.broadcaster
                    .broadcast_all(&WireEvent::new(
                        "channel_disconnected",
                        serde_json::json!({ "reason": reason }),
                    ))
                    .await;

                if self.auto_reconnect.load(Ordering::SeqCst) {
                    let manager = Arc::clone(self);
                    let backoff = self.settings.reconnect_backoff;
                    tokio::spawn(async move {
                        tokio::time::sleep(backoff).await;
                        if !manager.auto_reconnect.load(Ordering::SeqCst) {
                            return;
                        }
                        info!("Attempting channel reconnect");
                        if let Err(e) = manager.start().await {
                            warn!(error = %e, "Channel reconnect failed");
                        }
                    });
                }
            }
            ChannelEvent::Message(message) => {
                self.handle_message(message).await;
            }
        }
    }

    async fn enter_connected(&self) {
        {
            let mut session = self.session.lock().unwrap();
            session.state = SessionState::Connected;
            session.pairing_code = None;
            session.connected_at = Some(Utc::now());
            session.last_error = None;
        }
        self.connect_in_flight.store(false, Ordering::SeqCst);
        info!("Channel connected");
        self.broadcaster
            .broadcast_all(&WireEvent::new("channel_connected", serde_json::json!({})))
            .await;
    }

    /// Filter an inbound message against the allow-list and queue it for
    /// ingestion. Unauthorized senders are dropped with no reply.
    async fn handle_message(&self, message: InboundMessage) {
        if !self.settings.sender_allowed(&message.sender_id) {
            warn!(sender = %message.sender_id, "Dropping message from unauthorized sender");
            return;
        }
        if let Err(e) = self.ingest_tx.send(message).await {
            warn!(error = %e, "Ingestion pipeline is gone, dropping message");
        }
    }

    /// Send a message out through the channel, if the provider accepts it
    pub async fn send_message(&self, to: &str, text: &str) -> Result<(), ProviderError> {
        self.provider.send_message(to, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_manager(
        provider: MockProvider,
        allowed: &[&str],
    ) -> (Arc<ChannelConnectionManager>, mpsc::Receiver<InboundMessage>) {
        let mut settings = Settings::default();
        settings.allowed_senders = allowed.iter().map(|s| s.to_string()).collect();
        settings.reconnect_backoff = Duration::from_millis(10);

        let (tx, rx) = mpsc::channel(16);
        let manager = Arc::new(ChannelConnectionManager::new(
            ChannelClient::Mock(provider),
            &settings,
            Arc::new(EventBroadcaster::new()),
            tx,
        ));
        (manager, rx)
    }

    fn message(sender: &str, text: &str) -> InboundMessage {
        InboundMessage {
            sender_id: sender.to_string(),
            text: text.to_string(),
            occurred_at: Utc::now(),
            media_type: MediaType::Text,
        }
    }

    #[tokio::test]
    async fn test_start_reaches_connected() {
        let provider = MockProvider::new();
        let (manager, _rx) = make_manager(provider.clone(), &[]);

        manager.start().await.unwrap();
        assert_eq!(manager.status().state, SessionState::Connected);
        assert_eq!(provider.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_second_start_during_pairing_is_noop() {
        let provider = MockProvider::with_pairing("CODE-1234");
        let (manager, _rx) = make_manager(provider.clone(), &[]);

        manager.start().await.unwrap();
        let status = manager.status();
        assert_eq!(status.state, SessionState::Pairing);
        assert_eq!(status.pairing_code.as_deref(), Some("CODE-1234"));

        // Still pairing: a second start must not hit the gateway again
        manager.start().await.unwrap();
        assert_eq!(provider.connect_calls(), 1);

        manager.handle_event(ChannelEvent::Connected).await;
        assert_eq!(manager.status().state, SessionState::Connected);
        assert!(manager.status().pairing_code.is_none());
    }

    #[tokio::test]
    async fn test_explicit_disconnect_suppresses_auto_reconnect() {
        let provider = MockProvider::new();
        let (manager, _rx) = make_manager(provider.clone(), &[]);

        manager.start().await.unwrap();
        manager.disconnect().await.unwrap();
        assert_eq!(manager.status().state, SessionState::Disconnected);
        assert_eq!(provider.disconnect_calls(), 1);

        // A drop event after explicit disconnect must not trigger reconnect
        manager
            .handle_event(ChannelEvent::Dropped {
                reason: "network".to_string(),
            })
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(provider.connect_calls(), 1);
        assert_eq!(manager.status().state, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_unexpected_drop_triggers_backoff_reconnect() {
        let provider = MockProvider::new();
        let (manager, _rx) = make_manager(provider.clone(), &[]);

        manager.start().await.unwrap();
        manager
            .handle_event(ChannelEvent::Dropped {
                reason: "network".to_string(),
            })
            .await;
        let status = manager.status();
        assert_eq!(status.state, SessionState::Disconnected);
        assert_eq!(status.last_error.as_deref(), Some("network"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(provider.connect_calls(), 2);
        let status = manager.status();
        assert_eq!(status.state, SessionState::Connected);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_allow_list_filters_inbound_messages() {
        let provider = MockProvider::new();
        let (manager, mut rx) = make_manager(provider, &["alice"]);

        manager.start().await.unwrap();
        manager
            .handle_event(ChannelEvent::Message(message("mallory", "Spent 45")))
            .await;
        manager
            .handle_event(ChannelEvent::Message(message("alice", "Spent 45")))
            .await;

        let accepted = rx.try_recv().unwrap();
        assert_eq!(accepted.sender_id, "alice");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_allow_list_accepts_everyone() {
        let provider = MockProvider::new();
        let (manager, mut rx) = make_manager(provider, &[]);

        manager
            .handle_event(ChannelEvent::Message(message("anyone", "Spent 45")))
            .await;
        assert!(rx.try_recv().is_ok());
    }
}
