//! Command dispatcher: the single entry point for client messages.
//!
//! Messages are parsed and validated here. Playback commands are forwarded
//! to the session actor, whose inbox is the one serialization point for all
//! session mutation; registration messages go straight to the client
//! registry. Malformed messages never reach the session and are reported to
//! nobody but the log.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::clients::{ClientRegistry, ClientSink};
use crate::command::{BitrateLevel, Command};
use crate::engine::Credentials;
use crate::error::ErrorCode;
use crate::session::SessionHandle;

/// Dispatch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Wrong or missing fields; indicates a client protocol bug.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// The session actor has stopped.
    #[error("session closed")]
    SessionClosed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Inbound client message envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Prepare { payload: PreparePayload },
    Play,
    Pause,
    Seek { payload: SeekPayload },
    SetBitrate { payload: SetBitratePayload },
    RegisterClient,
    UnregisterClient,
    Heartbeat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparePayload {
    pub uri: String,
    pub access_token: String,
    pub access_token_expires: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekPayload {
    pub position_ms: i32,
}

#[derive(Debug, Deserialize)]
pub struct SetBitratePayload {
    pub level: BitrateLevel,
}

/// Direct answer to the sending client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    HeartbeatAck,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

pub struct CommandDispatcher {
    session: SessionHandle,
    registry: Arc<ClientRegistry>,
}

impl CommandDispatcher {
    pub fn new(session: SessionHandle, registry: Arc<ClientRegistry>) -> Self {
        Self { session, registry }
    }

    /// Parses and validates one text message.
    pub fn parse(text: &str) -> Result<ClientMessage, DispatchError> {
        let message: ClientMessage = serde_json::from_str(text)
            .map_err(|e| DispatchError::MalformedCommand(e.to_string()))?;

        if let ClientMessage::Prepare { payload } = &message {
            if payload.uri.is_empty() {
                return Err(DispatchError::MalformedCommand(
                    "prepare requires a uri".to_string(),
                ));
            }
        }
        Ok(message)
    }

    /// Routes a parsed message on behalf of `client`.
    pub async fn dispatch(
        &self,
        client: &Arc<dyn ClientSink>,
        message: ClientMessage,
    ) -> Result<Option<Reply>, DispatchError> {
        let command = match message {
            ClientMessage::Heartbeat => return Ok(Some(Reply::HeartbeatAck)),
            ClientMessage::RegisterClient => {
                self.registry.register(Arc::clone(client));
                return Ok(None);
            }
            ClientMessage::UnregisterClient => {
                self.registry.unregister(client.id());
                return Ok(None);
            }
            ClientMessage::Prepare { payload } => Command::Prepare {
                uri: payload.uri,
                credentials: Credentials::new(payload.access_token, payload.access_token_expires),
            },
            ClientMessage::Play => Command::Play,
            ClientMessage::Pause => Command::Pause,
            ClientMessage::Seek { payload } => Command::Seek {
                position_ms: payload.position_ms,
            },
            ClientMessage::SetBitrate { payload } => Command::SetBitrate {
                level: payload.level,
            },
        };

        self.session.send(command).await?;
        Ok(None)
    }

    /// Parses and routes a text message, logging any failure.
    pub async fn dispatch_text(&self, client: &Arc<dyn ClientSink>, text: &str) -> Option<Reply> {
        let result = match Self::parse(text) {
            Ok(message) => self.dispatch(client, message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(reply) => reply,
            Err(e @ DispatchError::MalformedCommand(_)) => {
                log::warn!(
                    "[Dispatcher] Dropping message from {} ({}): {}",
                    client.id(),
                    e.code(),
                    e
                );
                None
            }
            Err(e) => {
                log::error!(
                    "[Dispatcher] Message from {} lost ({}): {}",
                    client.id(),
                    e.code(),
                    e
                );
                None
            }
        }
    }
}
