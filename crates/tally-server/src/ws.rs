//! Dashboard WebSocket endpoint
//!
//! Each connection registers with the broadcaster under an owner id and
//! receives that owner's events plus session-level events. The socket is
//! one-way: inbound frames other than close/ping are ignored.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broadcast::{DashboardClient, CLIENT_QUEUE_DEPTH};
use crate::handlers::OwnerQuery;
use crate::AppState;

/// GET /ws?owner= - Upgrade to a dashboard event stream
pub async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OwnerQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, params.owner, socket))
}

async fn handle_socket(state: Arc<AppState>, owner_id: String, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(CLIENT_QUEUE_DEPTH);
    let client = Arc::new(DashboardClient::new(
        state.broadcaster.next_client_id(),
        owner_id.clone(),
        tx,
    ));
    let client_id = client.id.clone();
    state.broadcaster.add(client).await;
    info!(client = %client_id, owner = %owner_id, "Dashboard client connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            queued = rx.recv() => {
                match queued {
                    Some(json) => {
                        if sender.send(Message::Text(json.as_ref().clone())).await.is_err() {
                            break;
                        }
                    }
                    // Broadcaster dropped us (slow client)
                    None => break,
                }
            }
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by axum automatically; ignore the rest
                    Some(Ok(other)) => debug!(client = %client_id, ?other, "Ignoring inbound frame"),
                }
            }
        }
    }

    state.broadcaster.remove(&client_id).await;
    info!(client = %client_id, "Dashboard client disconnected");
}
