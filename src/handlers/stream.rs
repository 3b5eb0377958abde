//! WebSocket stream handlers
//!
//! Each connection owns one hub subscription and forwards payloads until the
//! client leaves or the hub closes the subscription on shutdown.

use std::sync::Arc;

use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};

use crate::AppState;
use crate::logic::hub::{Subscription, SubscriberHub};

/// Live feed of every generated event
pub async fn raw(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = Arc::clone(&state.raw_hub);
    ws.on_upgrade(move |socket| forward(socket, hub))
}

/// Live feed of malicious events with their verdicts
pub async fn processed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = Arc::clone(&state.processed_hub);
    ws.on_upgrade(move |socket| forward(socket, hub))
}

async fn forward(mut socket: WebSocket, hub: Arc<SubscriberHub>) {
    let Subscription { id, mut rx } = hub.subscribe();

    loop {
        tokio::select! {
            payload = rx.recv() => match payload {
                Some(payload) => {
                    if socket.send(Message::Text(payload.to_string())).await.is_err() {
                        break;
                    }
                }
                None => {
                    // Hub closed us
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },

            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }

    hub.unsubscribe(id);
    tracing::debug!(topic = hub.topic().as_str(), %id, "Stream closed");
}
