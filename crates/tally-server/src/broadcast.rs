//! Event fan-out to connected dashboard WebSocket clients.
//!
//! Delivery is at-most-once: events are serialized once, pushed with
//! `try_send`, and a client whose channel is full or closed is dropped
//! immediately. Disconnected dashboards miss events and are expected to
//! refetch state over the REST API when they reconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Per-client outbound queue depth. A dashboard that falls this far behind
/// is dropped rather than buffered further.
pub const CLIENT_QUEUE_DEPTH: usize = 64;

/// An event on the dashboard wire, serialized as `{"type": ..., "data": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct WireEvent {
    /// Event discriminator, e.g. "new_transaction", "reminder_due"
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub data: serde_json::Value,
}

impl WireEvent {
    pub fn new(event_type: &'static str, data: serde_json::Value) -> Self {
        Self { event_type, data }
    }
}

/// A connected dashboard client
pub struct DashboardClient {
    /// Unique connection ID
    pub id: String,
    /// The owner whose events this client receives
    pub owner_id: String,
    /// Send channel to the client's WebSocket write task
    tx: mpsc::Sender<Arc<String>>,
}

impl DashboardClient {
    pub fn new(id: String, owner_id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self { id, owner_id, tx }
    }

    /// Push a message to the client's write task.
    ///
    /// Returns `false` if the channel is full or closed.
    pub fn send(&self, message: Arc<String>) -> bool {
        self.tx.try_send(message).is_ok()
    }
}

/// Manages event broadcasting to connected dashboard clients
pub struct EventBroadcaster {
    /// Connected clients indexed by connection ID
    clients: RwLock<HashMap<String, Arc<DashboardClient>>>,
    /// Atomic counter tracking active connections (avoids read-locking for counts)
    active_count: AtomicUsize,
    /// Monotonic source for connection IDs
    next_id: AtomicU64,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a unique connection ID
    pub fn next_client_id(&self) -> String {
        format!("conn_{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a connection
    pub async fn add(&self, client: Arc<DashboardClient>) {
        let mut clients = self.clients.write().await;
        if clients.insert(client.id.clone(), client).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection by ID
    pub async fn remove(&self, client_id: &str) {
        let mut clients = self.clients.write().await;
        if clients.remove(client_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Broadcast an event to all clients watching the given owner
    pub async fn broadcast(&self, owner_id: &str, event: &WireEvent) {
        self.broadcast_to(|c| c.owner_id == owner_id, event, owner_id)
            .await;
    }

    /// Broadcast a session-level event to every connected client
    pub async fn broadcast_all(&self, event: &WireEvent) {
        self.broadcast_to(|_| true, event, "all").await;
    }

    /// Serialize once, fan out to matching clients, drop any that fail
    async fn broadcast_to(
        &self,
        filter: impl Fn(&DashboardClient) -> bool,
        event: &WireEvent,
        label: &str,
    ) {
        let json = match serde_json::to_string(event) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event_type = event.event_type, error = %e, "failed to serialize event");
                return;
            }
        };

        let mut to_remove = Vec::new();
        {
            let clients = self.clients.read().await;
            let mut recipients = 0u32;
            for client in clients.values() {
                if filter(client) {
                    recipients += 1;
                    if !client.send(Arc::clone(&json)) {
                        warn!(client_id = %client.id, label, "dropping unresponsive client");
                        to_remove.push(client.id.clone());
                    }
                }
            }
            debug!(
                event_type = event.event_type,
                label, recipients, "broadcast event"
            );
        }

        if !to_remove.is_empty() {
            let mut clients = self.clients.write().await;
            for id in &to_remove {
                if clients.remove(id).is_some() {
                    let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Number of active connections
    pub fn client_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client(
        broadcaster: &EventBroadcaster,
        owner: &str,
        depth: usize,
    ) -> (Arc<DashboardClient>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(depth);
        let client = Arc::new(DashboardClient::new(
            broadcaster.next_client_id(),
            owner.to_string(),
            tx,
        ));
        (client, rx)
    }

    fn event() -> WireEvent {
        WireEvent::new("new_transaction", serde_json::json!({"id": 1}))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_only_matching_owner() {
        let bc = EventBroadcaster::new();
        let (c1, mut rx1) = make_client(&bc, "owner-1", 8);
        let (c2, mut rx2) = make_client(&bc, "owner-2", 8);
        let (c3, mut rx3) = make_client(&bc, "owner-1", 8);
        bc.add(c1).await;
        bc.add(c2).await;
        bc.add(c3).await;

        bc.broadcast("owner-1", &event()).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_all_reaches_everyone() {
        let bc = EventBroadcaster::new();
        let (c1, mut rx1) = make_client(&bc, "owner-1", 8);
        let (c2, mut rx2) = make_client(&bc, "owner-2", 8);
        bc.add(c1).await;
        bc.add(c2).await;

        bc.broadcast_all(&WireEvent::new("channel_connected", serde_json::json!({})))
            .await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_failed_client_is_dropped_immediately() {
        let bc = EventBroadcaster::new();
        // Queue depth of 1: the second send fails
        let (c1, _rx1) = make_client(&bc, "owner-1", 1);
        let (c2, mut rx2) = make_client(&bc, "owner-1", 8);
        bc.add(c1).await;
        bc.add(c2).await;

        bc.broadcast("owner-1", &event()).await;
        assert_eq!(bc.client_count(), 2);

        bc.broadcast("owner-1", &event()).await;
        assert_eq!(bc.client_count(), 1);

        // The healthy client saw both events
        assert!(rx2.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let bc = EventBroadcaster::new();
        let (c1, _rx1) = make_client(&bc, "owner-1", 8);
        let id = c1.id.clone();
        bc.add(c1).await;
        assert_eq!(bc.client_count(), 1);

        bc.remove(&id).await;
        bc.remove(&id).await;
        assert_eq!(bc.client_count(), 0);
    }

    #[tokio::test]
    async fn test_event_serializes_with_type_tag() {
        let e = WireEvent::new("reminder_due", serde_json::json!({"id": 7}));
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&e).unwrap()).unwrap();
        assert_eq!(json["type"], "reminder_due");
        assert_eq!(json["data"]["id"], 7);
    }
}
