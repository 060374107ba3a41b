//! Connection factory used by the transport client.
//!
//! A [`Connector`] opens one physical connection and hands back a frame sink
//! and a frame stream. The client owns both for the lifetime of the connection
//! and asks the connector for a fresh pair on every (re)connect.

use std::borrow::Cow;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use super::config::ClientConfig;
use super::shared::{CloseEvent, Frame, TransportError};

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// An open connection, split into its write and read halves.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens physical connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Whether this connector can work in the current environment.
    fn is_supported(&self) -> bool {
        true
    }

    async fn connect(&self, config: &ClientConfig) -> Result<Connection, TransportError>;
}

/// Connector backed by tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, config: &ClientConfig) -> Result<Connection, TransportError> {
        let request = build_request(config)?;
        let (ws_stream, _response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(|e| TransportError::WebSocket(e.to_string()))
            .with(|frame: Frame| future::ready(Ok::<_, TransportError>(frame_to_message(frame))));

        let stream = read.filter_map(|item| {
            future::ready(match item {
                Ok(message) => message_to_frame(message).map(Ok),
                Err(e) => Some(Err(TransportError::WebSocket(e.to_string()))),
            })
        });

        Ok(Connection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

/// Build the handshake request, advertising the configured sub-protocols.
pub fn build_request(config: &ClientConfig) -> Result<Request, TransportError> {
    let mut request = config
        .endpoint()
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    if !config.protocols().is_empty() {
        let value = HeaderValue::from_str(&config.protocols().join(", "))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(request)
}

fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
        Frame::Close(event) => Message::Close(event.map(|event| CloseFrame {
            code: CloseCode::from(event.code),
            reason: Cow::Owned(event.reason),
        })),
    }
}

// Ping/pong are answered by tungstenite itself
fn message_to_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Binary(bytes) => Some(Frame::Binary(bytes)),
        Message::Close(frame) => Some(Frame::Close(frame.map(|frame| {
            CloseEvent::new(u16::from(frame.code), frame.reason.into_owned())
        }))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_sub_protocols() {
        let config = ClientConfig::new("ws://localhost:51000")
            .expect("valid")
            .with_protocols(["chat.v1", "json"]);
        let request = build_request(&config).expect("request");

        assert_eq!(
            request
                .headers()
                .get(SEC_WEBSOCKET_PROTOCOL)
                .and_then(|v| v.to_str().ok()),
            Some("chat.v1, json")
        );
    }

    #[test]
    fn request_without_protocols_has_no_header() {
        let config = ClientConfig::new("ws://localhost:51000").expect("valid");
        let request = build_request(&config).expect("request");
        assert!(request.headers().get(SEC_WEBSOCKET_PROTOCOL).is_none());
    }

    #[test]
    fn control_frames_are_not_surfaced() {
        assert_eq!(message_to_frame(Message::Ping(vec![1])), None);
        assert_eq!(message_to_frame(Message::Pong(vec![])), None);
        assert_eq!(
            message_to_frame(Message::Text("hi".into())),
            Some(Frame::Text("hi".into()))
        );
    }

    #[test]
    fn close_frames_keep_code_and_reason() {
        let message = frame_to_message(Frame::Close(Some(CloseEvent::new(4000, "bye"))));
        let round = message_to_frame(message).expect("close frame");
        assert_eq!(round, Frame::Close(Some(CloseEvent::new(4000, "bye"))));
    }
}
