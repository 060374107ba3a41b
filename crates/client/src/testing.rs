//! Scripted connector for exercising the transport client without a network.
//!
//! Each call to [`Connector::connect`] consumes the next [`ConnectOutcome`].
//! An empty script refuses the connection. Accepted connections hand a
//! [`MockPeer`] to the test, which plays the server side.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_channel::mpsc as fmpsc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::websocket::{ClientConfig, Connection, Connector, Frame, TransportError};

#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Accept,
    Refuse(String),
    /// Never resolves; the attempt stays in `Connecting`
    Hang,
}

pub struct MockConnector {
    script: Mutex<VecDeque<ConnectOutcome>>,
    attempts: Mutex<Vec<Instant>>,
    peers: mpsc::UnboundedSender<MockPeer>,
    supported: bool,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        Self::build(true)
    }

    /// Connector that reports itself unavailable.
    pub fn unsupported() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        Self::build(false)
    }

    fn build(supported: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            script: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
            peers,
            supported,
        };
        (Arc::new(connector), rx)
    }

    pub fn push(&self, outcome: ConnectOutcome) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    pub fn accept_next(&self) {
        self.push(ConnectOutcome::Accept);
    }

    pub fn refuse_next(&self, reason: impl Into<String>) {
        self.push(ConnectOutcome::Refuse(reason.into()));
    }

    /// When each connection attempt started.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn connect(&self, _config: &ClientConfig) -> Result<Connection, TransportError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| ConnectOutcome::Refuse("connection refused".to_string()));

        match outcome {
            ConnectOutcome::Refuse(reason) => Err(TransportError::Connect(reason)),
            ConnectOutcome::Hang => futures_util::future::pending().await,
            ConnectOutcome::Accept => {
                let (to_client, client_inbound) = fmpsc::unbounded();
                let (client_outbound, from_client) = fmpsc::unbounded();
                let peer = MockPeer {
                    to_client,
                    from_client,
                };
                if self.peers.send(peer).is_err() {
                    return Err(TransportError::Connect("peer receiver dropped".to_string()));
                }

                let sink = client_outbound
                    .sink_map_err(|e| TransportError::WebSocket(e.to_string()));
                Ok(Connection {
                    sink: Box::pin(sink),
                    stream: Box::pin(client_inbound),
                })
            }
        }
    }
}

/// Server side of an accepted mock connection.
///
/// Dropping the peer ends the client's inbound stream, which the client treats
/// as an abnormal close.
pub struct MockPeer {
    to_client: fmpsc::UnboundedSender<Result<Frame, TransportError>>,
    from_client: fmpsc::UnboundedReceiver<Frame>,
}

impl MockPeer {
    pub fn send_frame(&self, frame: Frame) {
        let _ = self.to_client.unbounded_send(Ok(frame));
    }

    pub fn send_text(&self, text: &str) {
        self.send_frame(Frame::Text(text.to_string()));
    }

    pub fn send_error(&self, error: TransportError) {
        let _ = self.to_client.unbounded_send(Err(error));
    }

    pub fn drop_connection(self) {
        drop(self);
    }

    /// Next frame written by the client, `None` once it closed its sink.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.next().await
    }
}
