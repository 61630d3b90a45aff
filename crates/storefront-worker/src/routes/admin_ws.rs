//! Websocket push to connected administrators.
//!
//! Every message the realtime broadcast channel sends to the `Admins` group
//! is forwarded to each open session as a text frame
//! `{ "target": "...", "arguments": [payload] }`.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use storefront_notifications::channels::{ADMINS_GROUP, BroadcastHub, HubMessage};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct PushFrame<'a> {
    target: &'a str,
    arguments: [&'a serde_json::Value; 1],
}

/// Encodes a hub message as the text frame sent to clients.
///
/// # Errors
///
/// Returns the serializer error if the payload cannot be encoded.
pub fn encode_push(message: &HubMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PushFrame {
        target: &message.target,
        arguments: [&message.payload],
    })
}

/// GET /ws/admins
async fn admin_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| forward_pushes(socket, state.hub))
}

async fn forward_pushes(socket: WebSocket, hub: BroadcastHub) {
    let mut pushes = hub.subscribe(ADMINS_GROUP);
    let (mut sink, mut incoming) = socket.split();
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await;
    info!(
        admins_connected = hub.group_size(ADMINS_GROUP),
        "admin session opened"
    );

    loop {
        tokio::select! {
            push = pushes.recv() => match push {
                Ok(message) => {
                    let text = match encode_push(&message) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(target_name = %message.target, error = %err, "push encoding failed");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "admin session lagging, pushes dropped");
                }
                Err(RecvError::Closed) => break,
            },
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(pushes);
    debug!(
        admins_connected = hub.group_size(ADMINS_GROUP),
        "admin session closed"
    );
}

/// Returns the admin push router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws/admins", get(admin_socket))
}
