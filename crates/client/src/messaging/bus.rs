//! Message bus for routing commands to in-process handlers.
//!
//! The bus maps a command type to exactly one handler. Registering a second
//! handler for the same type replaces the first. A command with no registered
//! handler is logged and absorbed so a missing registration cannot crash the
//! caller; a handler's own failure is returned to the caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use randomtalk_shared::{Command, CommandType};

/// Handles commands of one type.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: Command) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Command) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, command: Command) -> anyhow::Result<()> {
        (self.0)(command).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Command) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Error returned when a registered handler fails.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("handler for {command_type} failed: {source}")]
    Handler {
        command_type: CommandType,
        #[source]
        source: anyhow::Error,
    },
}

/// Outcome of [`MessageBus::send`] when no handler error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A handler ran and succeeded
    Handled,
    /// No handler is registered for the command type
    Unroutable,
}

/// In-process registry mapping command types to handlers.
///
/// Registration and lookup are serialized by an `RwLock`; the handler is cloned
/// out before it runs so no lock is held across an await.
#[derive(Default)]
pub struct MessageBus {
    handlers: RwLock<HashMap<CommandType, Arc<dyn CommandHandler>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `command_type`, replacing any existing handler.
    pub fn register_handler(
        &self,
        command_type: impl Into<CommandType>,
        handler: Arc<dyn CommandHandler>,
    ) {
        let command_type = command_type.into();
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&command_type) {
            tracing::warn!(
                command_type = %command_type,
                "Handler for command type already exists. It will be overwritten."
            );
        }
        handlers.insert(command_type, handler);
    }

    /// Remove the handler for `command_type`. Returns true if one was registered.
    pub fn unregister_handler(&self, command_type: &CommandType) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(command_type)
            .is_some()
    }

    pub fn has_handler(&self, command_type: &CommandType) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(command_type)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn handler_for(&self, command_type: &CommandType) -> Option<Arc<dyn CommandHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command_type)
            .cloned()
    }

    /// Route a command to its handler.
    ///
    /// Returns `Ok(Delivery::Unroutable)` when nothing is registered for the
    /// command type; only handler failures are returned as errors.
    pub async fn send(&self, command: Command) -> Result<Delivery, DispatchError> {
        let command_type = command.command_type().clone();
        let Some(handler) = self.handler_for(&command_type) else {
            tracing::error!(
                command_type = %command_type,
                "Message handler not found for command"
            );
            return Ok(Delivery::Unroutable);
        };

        handler
            .handle(command)
            .await
            .map_err(|source| DispatchError::Handler {
                command_type,
                source,
            })?;
        Ok(Delivery::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::always;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ty(s: &str) -> CommandType {
        CommandType::new(s).expect("valid command type")
    }

    #[tokio::test]
    async fn send_invokes_registered_handler_with_payload() {
        let bus = MessageBus::new();
        let mut handler = MockCommandHandler::new();
        handler
            .expect_handle()
            .withf(|cmd| cmd.command_type().as_str() == "x" && cmd.payload() == &json!({"a": 1}))
            .times(1)
            .returning(|_| Ok(()));
        bus.register_handler(ty("x"), Arc::new(handler));

        let delivery = bus
            .send(Command::new(ty("x"), json!({"a": 1})))
            .await
            .expect("handler succeeds");
        assert_eq!(delivery, Delivery::Handled);
    }

    #[tokio::test]
    async fn re_registration_replaces_previous_handler() {
        let bus = MessageBus::new();

        let mut first = MockCommandHandler::new();
        first.expect_handle().never();
        let mut second = MockCommandHandler::new();
        second
            .expect_handle()
            .with(always())
            .times(2)
            .returning(|_| Ok(()));

        bus.register_handler(ty("x"), Arc::new(first));
        bus.register_handler(ty("x"), Arc::new(second));
        assert_eq!(bus.handler_count(), 1);

        bus.send(Command::new(ty("x"), json!(1))).await.expect("ok");
        bus.send(Command::new(ty("x"), json!(2))).await.expect("ok");
    }

    #[tokio::test]
    async fn unregistered_type_is_absorbed() {
        let bus = MessageBus::new();
        let mut other = MockCommandHandler::new();
        other.expect_handle().never();
        bus.register_handler(ty("other"), Arc::new(other));

        let delivery = bus
            .send(Command::new(ty("missing"), json!(null)))
            .await
            .expect("unroutable is not an error");
        assert_eq!(delivery, Delivery::Unroutable);
    }

    #[tokio::test]
    async fn handler_failure_propagates() {
        let bus = MessageBus::new();
        let mut handler = MockCommandHandler::new();
        handler
            .expect_handle()
            .returning(|_| Err(anyhow::anyhow!("invalid local state")));
        bus.register_handler(ty("x"), Arc::new(handler));

        let err = bus
            .send(Command::new(ty("x"), json!(null)))
            .await
            .expect_err("handler error surfaces");
        let DispatchError::Handler { command_type, source } = err;
        assert_eq!(command_type, ty("x"));
        assert_eq!(source.to_string(), "invalid local state");
    }

    #[tokio::test]
    async fn closure_handlers_share_state() {
        let bus = MessageBus::new();
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = Arc::clone(&count);
        bus.register_handler(
            ty("tick"),
            handler_fn(move |_cmd| {
                let count = Arc::clone(&count_clone);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        for _ in 0..3 {
            bus.send(Command::new(ty("tick"), json!(null))).await.expect("ok");
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unregister_removes_handler() {
        let bus = MessageBus::new();
        bus.register_handler(ty("x"), handler_fn(|_| async { Ok(()) }));
        assert!(bus.has_handler(&ty("x")));
        assert!(bus.unregister_handler(&ty("x")));
        assert!(!bus.has_handler(&ty("x")));
        assert!(!bus.unregister_handler(&ty("x")));
    }
}
