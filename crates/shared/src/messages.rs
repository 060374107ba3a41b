//! WebSocket frame types for the client transport
//!
//! Outbound traffic is a single tagged frame kind (`command`). Inbound traffic
//! has no enforced schema: whatever the server sends is surfaced as a
//! [`Notification`], structured when it parses as JSON and raw otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::command::{Command, CommandType};

// =============================================================================
// Client Frames (Client → Server)
// =============================================================================

/// Frames sent from the client to the chat server.
///
/// Serializes as `{"kind": "<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    Command(CommandEnvelope),
}

/// Wire form of a [`Command`], with a per-transmission id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl CommandEnvelope {
    /// Wrap a command for transmission.
    ///
    /// A fresh id is generated on every call; a missing timestamp becomes `now`.
    pub fn wrap(command: &Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            command_type: command.command_type().clone(),
            payload: command.payload().clone(),
            timestamp: command.timestamp().unwrap_or_else(Utc::now),
        }
    }
}

impl ClientFrame {
    pub fn command(command: &Command) -> Self {
        ClientFrame::Command(CommandEnvelope::wrap(command))
    }

    pub fn id(&self) -> Uuid {
        match self {
            ClientFrame::Command(envelope) => envelope.id,
        }
    }
}

// =============================================================================
// Notifications (Server → Client)
// =============================================================================

/// An inbound frame as handed to the notification sink.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The frame parsed as JSON
    Structured(Value),
    /// The frame was text but not JSON
    Raw(String),
    /// The frame was binary and neither JSON nor UTF-8
    Binary(Vec<u8>),
}

impl Notification {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Notification::Structured(value),
            Err(_) => Notification::Raw(text),
        }
    }

    pub fn from_binary(bytes: Vec<u8>) -> Self {
        if let Ok(value) = serde_json::from_slice(&bytes) {
            return Notification::Structured(value);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Notification::Raw(text),
            Err(e) => Notification::Binary(e.into_bytes()),
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Notification::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Notification::Raw(_) | Notification::Binary(_))
    }
}
