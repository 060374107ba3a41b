//! Application context: the composition of bus, dispatcher and transport.
//!
//! `AppContext::mount` builds one bus and one transport, wires the transport in
//! as the handler for commands that go to the server, and starts connecting.
//! `AppContext::unmount` (or dropping the context) closes the transport. There are no globals; callers
//! hand the context (or the dispatcher it exposes) to whatever needs it.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use randomtalk_shared::{
    Command, CommandType, CreateChatSessionPayload, KnownCommand, Notification,
};

use crate::messaging::{BusDispatcher, CommandHandler, ConnectionState, Dispatcher, MessageBus};
use crate::websocket::{
    ClientConfig, CloseEvent, TransportClient, TransportError, TransportObserver,
};

/// Commands forwarded to the server by default.
pub const FORWARDED_COMMANDS: [KnownCommand; 1] = [KnownCommand::CreateChatSession];

/// A handler to register on the bus at mount time.
pub struct HandlerRegistration {
    command_type: CommandType,
    handler: Arc<dyn CommandHandler>,
}

impl HandlerRegistration {
    pub fn new(command_type: impl Into<CommandType>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            command_type: command_type.into(),
            handler,
        }
    }
}

/// Bus handler that writes commands to the transport.
///
/// A command sent while the transport is not open is dropped by the transport
/// with a warning; the handler still succeeds.
#[derive(Debug, Clone)]
pub struct ForwardToTransport {
    transport: TransportClient,
}

impl ForwardToTransport {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl CommandHandler for ForwardToTransport {
    async fn handle(&self, command: Command) -> anyhow::Result<()> {
        self.transport.send_command(&command);
        Ok(())
    }
}

/// Ask the server to open a chat session for `payload`.
pub async fn request_chat_session(
    dispatcher: &dyn Dispatcher,
    payload: CreateChatSessionPayload,
) -> anyhow::Result<()> {
    let nickname = payload.user_nickname.clone();
    let command = payload.into_command()?;
    dispatcher.dispatch_command(command).await?;
    tracing::info!(nickname = %nickname, "Requested chat session");
    Ok(())
}

/// Keeps the most recent notification, then passes every event on.
struct LatestNotification {
    latest: Arc<RwLock<Option<Notification>>>,
    inner: Arc<dyn TransportObserver>,
}

impl TransportObserver for LatestNotification {
    fn on_open(&self) {
        self.inner.on_open();
    }

    fn on_close(&self, event: &CloseEvent) {
        self.inner.on_close(event);
    }

    fn on_error(&self, error: &TransportError) {
        self.inner.on_error(error);
    }

    fn on_notification(&self, notification: Notification) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(notification.clone());
        self.inner.on_notification(notification);
    }
}

/// Mounted messaging core.
///
/// Dropping the context closes the transport, like [`AppContext::unmount`].
pub struct AppContext {
    bus: Arc<MessageBus>,
    dispatcher: BusDispatcher,
    transport: TransportClient,
    latest: Arc<RwLock<Option<Notification>>>,
}

impl AppContext {
    /// Mount with the tokio-tungstenite transport for `config`.
    pub fn mount(
        config: ClientConfig,
        handlers: impl IntoIterator<Item = HandlerRegistration>,
        observer: Arc<dyn TransportObserver>,
    ) -> Self {
        Self::mount_with_transport(TransportClient::new(config), handlers, observer)
    }

    /// Mount around an existing (not yet connected) transport.
    ///
    /// Application handlers are registered after the forwarding handler, so an
    /// application may take over a forwarded command type.
    pub fn mount_with_transport(
        transport: TransportClient,
        handlers: impl IntoIterator<Item = HandlerRegistration>,
        observer: Arc<dyn TransportObserver>,
    ) -> Self {
        let bus = Arc::new(MessageBus::new());
        let forward: Arc<dyn CommandHandler> = Arc::new(ForwardToTransport::new(transport.clone()));
        for command in FORWARDED_COMMANDS {
            bus.register_handler(command, Arc::clone(&forward));
        }
        for registration in handlers {
            bus.register_handler(registration.command_type, registration.handler);
        }

        let latest = Arc::new(RwLock::new(None));
        transport.set_observer(Arc::new(LatestNotification {
            latest: Arc::clone(&latest),
            inner: observer,
        }));

        tracing::info!(
            url = %transport.config().endpoint(),
            handlers = bus.handler_count(),
            "Mounting messaging context"
        );
        transport.connect();

        Self {
            dispatcher: BusDispatcher::new(Arc::clone(&bus)),
            bus,
            transport,
            latest,
        }
    }

    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        Arc::new(self.dispatcher.clone())
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn transport(&self) -> &TransportClient {
        &self.transport
    }

    pub fn latest_notification(&self) -> Option<Notification> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Close the transport. Pending reconnects are cancelled.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        tracing::info!("Unmounting messaging context");
        self.transport.close();
    }
}
