//! WebSocket transport: one socket per bound client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::clients::{Binding, ChannelClient, ClientSink};
use crate::dispatcher::Reply;
use crate::error::PlaylinkError;
use crate::events::PlaybackEvent;

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Message Types
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters of the bind request.
#[derive(Deserialize)]
pub struct BindParams {
    #[serde(default)]
    protocol: String,
}

/// Direct replies sent to one socket.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum WsOutgoing {
    HeartbeatAck,
}

impl From<Reply> for WsOutgoing {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::HeartbeatAck => Self::HeartbeatAck,
        }
    }
}

impl WsOutgoing {
    /// Serializes the message to a WebSocket text message.
    fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self)
            .ok()
            .map(|s| Message::Text(s.into()))
    }
}

fn event_message(event: &PlaybackEvent) -> Option<Message> {
    serde_json::to_string(event)
        .ok()
        .map(|s| Message::Text(s.into()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Binds the client and upgrades to a WebSocket.
///
/// An unrecognized protocol is rejected before the upgrade.
pub async fn ws_handler(
    Query(params): Query<BindParams>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(binding) = state.bind_point.bind(&params.protocol) else {
        return PlaylinkError::UnsupportedProtocol(params.protocol).into_response();
    };
    ws.on_upgrade(move |socket| handle_ws(socket, state, binding))
        .into_response()
}

/// Main WebSocket connection handler.
async fn handle_ws(socket: WebSocket, state: AppState, binding: Binding) {
    let (mut sender, mut receiver) = socket.split();
    let mut last_activity = Instant::now();

    let conn_guard = state.ws_manager.register();
    let cancel_token = conn_guard.cancel_token().clone();
    // The registry cancels this token if it drops the client, ending the loop.
    let (client, mut events) = ChannelClient::with_close_token(
        conn_guard.client_id().clone(),
        state.config.client_queue_capacity,
        cancel_token.clone(),
    );
    let client: Arc<dyn ClientSink> = client;

    let heartbeat_timeout = Duration::from_secs(state.config.ws_heartbeat_timeout_secs);
    let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(
        state.config.ws_heartbeat_check_interval_secs,
    ));
    heartbeat_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log::info!("[WS] Closing {} from the server side", client.id());
                break;
            }
            msg = receiver.next() => {
                last_activity = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = state.dispatcher.dispatch_text(&client, text.as_str()).await;
                        if let Some(msg) = reply.and_then(|r| WsOutgoing::from(r).to_message()) {
                            if sender.send(msg).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            Some(event) = events.recv() => {
                if let Some(msg) = event_message(&event) {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
            }
            _ = heartbeat_interval.tick() => {
                if last_activity.elapsed() > heartbeat_timeout {
                    log::warn!("[WS] Heartbeat timeout: {}", client.id());
                    break;
                }
            }
        }
    }

    state.registry.unregister(client.id());
    binding.release();
    // ConnectionGuard drop removes the connection from the manager.
}
