//! Outbound channel notifications
//!
//! Thin gate in front of the channel transport: sends fail fast when the
//! session is not connected, and there is no retry or queueing. Callers
//! decide what a failed notification means (the scheduler, for instance,
//! leaves the reminder un-notified so the next tick retries naturally).

use std::sync::Arc;

use crate::channel::ChannelConnectionManager;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Channel is not connected")]
    NotConnected,
    #[error("Channel send failed: {0}")]
    Provider(String),
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    manager: Arc<ChannelConnectionManager>,
}

impl NotificationDispatcher {
    pub fn new(manager: Arc<ChannelConnectionManager>) -> Self {
        Self { manager }
    }

    /// Send a text notification to an owner over the channel
    pub async fn send(&self, owner_id: &str, text: &str) -> Result<(), DispatchError> {
        if !self.manager.is_connected() {
            return Err(DispatchError::NotConnected);
        }
        self.manager
            .send_message(owner_id, text)
            .await
            .map_err(|e| DispatchError::Provider(e.to_string()))
    }
}
