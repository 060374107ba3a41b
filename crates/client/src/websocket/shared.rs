//! Shared helpers for the WebSocket transport.
//!
//! This module is runtime-agnostic (no tokio, no tungstenite) so the client
//! state machine and the connectors agree on one frame and error vocabulary.

use randomtalk_shared::Notification;

// Reconnection defaults
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Close code used when the connection ended without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Close code sent when the client closes on purpose.
pub const CLOSE_NORMAL: u16 = 1000;

/// A data or close frame as seen by the transport client.
///
/// Control frames (ping/pong) are handled by the connector and never surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<CloseEvent>),
}

/// Why a connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
    /// The closing handshake completed
    pub was_clean: bool,
}

impl CloseEvent {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// The connection dropped or never opened.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
            was_clean: false,
        }
    }

    pub fn normal() -> Self {
        Self::new(CLOSE_NORMAL, "")
    }
}

/// Transport-level failures reported through the observer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No async runtime or connector support in this environment
    #[error("WebSocket is not supported in this environment: {0}")]
    Unsupported(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("failed to serialize frame: {0}")]
    Serialization(String),

    #[error("invalid connection request: {0}")]
    InvalidRequest(String),
}

/// Turn an inbound data frame into a notification.
///
/// Text and binary frames always produce a notification, falling back to the
/// raw content when it is not JSON.
pub fn parse_inbound(frame: Frame) -> Option<Notification> {
    match frame {
        Frame::Text(text) => Some(Notification::from_text(text)),
        Frame::Binary(bytes) => Some(Notification::from_binary(bytes)),
        Frame::Close(_) => None,
    }
}
