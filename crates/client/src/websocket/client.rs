//! Reconnecting transport client.
//!
//! `TransportClient` owns one logical connection to the chat server. Every
//! connection attempt gets a generation number; events from a superseded
//! attempt are ignored. At most one reconnect timer is pending at any time and
//! an explicit [`TransportClient::close`] suppresses reconnection until the
//! next [`TransportClient::connect`].

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use randomtalk_shared::{ClientFrame, Command};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::config::ClientConfig;
use super::connector::{Connection, Connector, TungsteniteConnector};
use super::core::ReconnectPolicy;
use super::events::{NoopObserver, TransportObserver};
use super::shared::{parse_inbound, CloseEvent, Frame, TransportError};
use crate::messaging::connection::set_connection_state;
use crate::messaging::{ConnectionState, ConnectionStateObserver};

/// Handle to a reconnecting WebSocket connection.
///
/// Cheap to clone; all clones drive the same connection.
#[derive(Clone)]
pub struct TransportClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    observer: RwLock<Arc<dyn TransportObserver>>,
    state: Arc<AtomicU8>,
    unsupported_reported: AtomicBool,
    session: Mutex<Session>,
}

struct Session {
    generation: u64,
    policy: ReconnectPolicy,
    forced_close: bool,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    connection_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl TransportClient {
    /// Client using the tokio-tungstenite connector.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let policy = ReconnectPolicy::new(config.max_retries(), config.reconnect_delay());
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                observer: RwLock::new(Arc::new(NoopObserver)),
                state: Arc::new(AtomicU8::new(ConnectionState::Idle.to_u8())),
                unsupported_reported: AtomicBool::new(false),
                session: Mutex::new(Session {
                    generation: 0,
                    policy,
                    forced_close: false,
                    outbound: None,
                    connection_task: None,
                    reconnect_timer: None,
                }),
            }),
        }
    }

    /// Replace the registered observer. Only the latest one receives events.
    pub fn set_observer(&self, observer: Arc<dyn TransportObserver>) {
        *self
            .inner
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = observer;
    }

    /// Open a connection, replacing any current attempt and pending timer.
    ///
    /// Clears a previous explicit close. Without a tokio runtime (or with an
    /// unsupported connector) this reports once and does nothing.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Send a command if the connection is open.
    ///
    /// Returns the envelope id on success. When not open the command is dropped
    /// with a warning.
    pub fn send_command(&self, command: &Command) -> Option<Uuid> {
        self.inner.send_command(command)
    }

    /// Close the connection and cancel any pending reconnect.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn state_observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(Arc::clone(&self.inner.state))
    }

    /// Consecutive reconnects since the last successful open.
    pub fn retry_count(&self) -> u32 {
        self.inner.lock_session().policy.attempts()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("endpoint", &self.inner.config.endpoint().as_str())
            .field("state", &self.state())
            .finish()
    }
}

impl Inner {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ConnectionState) {
        set_connection_state(&self.state, state);
    }

    fn observer(&self) -> Arc<dyn TransportObserver> {
        Arc::clone(&self.observer.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_session().generation == generation
    }

    fn connect(self: &Arc<Self>) {
        let Some(runtime) = self.runtime_or_report() else {
            return;
        };

        let mut session = self.lock_session();
        session.forced_close = false;
        self.start_connection(&mut session, &runtime);
    }

    /// Must be called with the session lock held.
    fn start_connection(self: &Arc<Self>, session: &mut Session, runtime: &Handle) {
        if let Some(timer) = session.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(task) = session.connection_task.take() {
            tracing::debug!("Replacing current connection attempt");
            task.abort();
        }
        session.outbound = None;
        session.generation += 1;
        let generation = session.generation;

        self.set_state(ConnectionState::Connecting);
        tracing::info!(
            url = %self.config.endpoint(),
            attempt = session.policy.attempts(),
            "Connecting to chat server"
        );

        let inner = Arc::clone(self);
        session.connection_task =
            Some(runtime.spawn(async move { inner.run_connection(generation).await }));
    }

    fn runtime_or_report(&self) -> Option<Handle> {
        if !self.connector.is_supported() {
            self.report_unsupported("connector is not available on this platform".to_string());
            return None;
        }
        match Handle::try_current() {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.report_unsupported(e.to_string());
                None
            }
        }
    }

    fn report_unsupported(&self, reason: String) {
        if self.unsupported_reported.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::error!(reason = %reason, "WebSocket is not supported in this environment.");
        self.observer().on_error(&TransportError::Unsupported(reason));
    }

    async fn run_connection(self: Arc<Self>, generation: u64) {
        let Connection {
            mut sink,
            mut stream,
        } = match self.connector.connect(&self.config).await {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!(url = %self.config.endpoint(), error = %error, "WebSocket connection failed");
                if self.is_current(generation) {
                    self.observer().on_error(&error);
                }
                self.handle_close(generation, CloseEvent::abnormal(error.to_string()));
                return;
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        {
            let mut session = self.lock_session();
            if session.generation != generation {
                tracing::debug!(generation, "Dropping superseded connection");
                return;
            }
            session.policy.reset();
            session.outbound = Some(tx);
            self.set_state(ConnectionState::Open);
        }
        tracing::info!(url = %self.config.endpoint(), "WebSocket connected.");
        self.observer().on_open();

        let close_event = loop {
            tokio::select! {
                outbound = rx.recv() => match outbound {
                    Some(Frame::Close(event)) => {
                        let event = event.unwrap_or_else(CloseEvent::normal);
                        if let Err(e) = sink.send(Frame::Close(Some(event.clone()))).await {
                            tracing::debug!(error = %e, "Failed to send close frame");
                        }
                        if let Err(e) = sink.close().await {
                            tracing::debug!(error = %e, "Failed to flush connection on close");
                        }
                        break event;
                    }
                    Some(frame) => {
                        if let Err(error) = sink.send(frame).await {
                            tracing::error!(error = %error, "Failed to send frame");
                            self.observer().on_error(&error);
                        }
                    }
                    None => break CloseEvent::abnormal("connection replaced"),
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(Frame::Close(event))) => {
                        break event.unwrap_or_else(|| CloseEvent::new(1005, ""));
                    }
                    Some(Ok(frame)) => {
                        if let Some(notification) = parse_inbound(frame) {
                            self.observer().on_notification(notification);
                        }
                    }
                    Some(Err(error)) => {
                        tracing::error!(error = %error, "WebSocket error");
                        self.observer().on_error(&error);
                    }
                    None => break CloseEvent::abnormal("connection dropped"),
                },
            }
        };

        self.handle_close(generation, close_event);
    }

    fn handle_close(self: &Arc<Self>, generation: u64, event: CloseEvent) {
        {
            let mut session = self.lock_session();
            if session.generation != generation {
                return;
            }
            session.outbound = None;
            // This is the running task; drop the handle without aborting.
            session.connection_task = None;
            self.set_state(ConnectionState::Closed);

            if !session.forced_close {
                match session.policy.next_delay_and_advance() {
                    Some(delay) => self.schedule_reconnect(&mut session, generation, delay),
                    None => tracing::warn!(
                        max_retries = session.policy.max_retries(),
                        "Max reconnection attempts reached, giving up"
                    ),
                }
            }
        }

        tracing::info!(code = event.code, reason = %event.reason, "WebSocket closed");
        self.observer().on_close(&event);
    }

    fn schedule_reconnect(self: &Arc<Self>, session: &mut Session, generation: u64, delay: Duration) {
        if let Some(timer) = session.reconnect_timer.take() {
            timer.abort();
        }

        tracing::info!(
            delay_ms = delay_millis(delay),
            attempt = session.policy.attempts(),
            max_retries = session.policy.max_retries(),
            "Reconnecting in {:?}...",
            delay
        );

        let weak: Weak<Inner> = Arc::downgrade(self);
        session.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.reconnect_due(generation);
            }
        }));
    }

    fn reconnect_due(self: &Arc<Self>, generation: u64) {
        let mut session = self.lock_session();
        if session.forced_close || session.generation != generation {
            return;
        }
        // Fired timer is this task; forget it rather than abort it.
        session.reconnect_timer = None;
        let Ok(runtime) = Handle::try_current() else {
            return;
        };
        self.start_connection(&mut session, &runtime);
    }

    fn send_command(&self, command: &Command) -> Option<Uuid> {
        let outbound = {
            let session = self.lock_session();
            match (&session.outbound, self.state()) {
                (Some(tx), ConnectionState::Open) => tx.clone(),
                _ => {
                    tracing::warn!(
                        command_type = %command.command_type(),
                        state = ?self.state(),
                        "WebSocket is not open. Cannot send command"
                    );
                    return None;
                }
            }
        };

        let frame = ClientFrame::command(command);
        let id = frame.id();
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize command frame");
                self.observer()
                    .on_error(&TransportError::Serialization(e.to_string()));
                return None;
            }
        };

        if outbound.send(Frame::Text(json)).is_err() {
            tracing::warn!(id = %id, "Connection closed before the command was sent");
            return None;
        }

        tracing::debug!(id = %id, command_type = %command.command_type(), "Command sent");
        Some(id)
    }

    fn close(&self) {
        let aborted_attempt = {
            let mut session = self.lock_session();
            session.forced_close = true;
            if let Some(timer) = session.reconnect_timer.take() {
                tracing::debug!("Cancelled pending reconnect");
                timer.abort();
            }

            match session.outbound.take() {
                Some(tx) => {
                    self.set_state(ConnectionState::Closing);
                    if tx.send(Frame::Close(Some(CloseEvent::normal()))).is_err() {
                        tracing::debug!("Connection task already finished");
                    }
                    false
                }
                None if self.state() == ConnectionState::Closing => false,
                None => match session.connection_task.take() {
                    Some(task) => {
                        task.abort();
                        session.generation += 1;
                        self.set_state(ConnectionState::Closed);
                        true
                    }
                    None => {
                        if self.state() != ConnectionState::Idle {
                            self.set_state(ConnectionState::Closed);
                        }
                        false
                    }
                },
            }
        };

        if aborted_attempt {
            let event = CloseEvent::abnormal("closed before the connection opened");
            tracing::info!(code = event.code, reason = %event.reason, "WebSocket closed");
            self.observer().on_close(&event);
        }
    }
}

fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
