//! Command dispatcher.
//!
//! UI code depends on the `Dispatcher` capability rather than on a concrete bus.

use std::sync::Arc;

use async_trait::async_trait;
use randomtalk_shared::Command;

use super::bus::{DispatchError, MessageBus};

/// Dispatches commands to the appropriate handler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatch a command.
    ///
    /// A failing handler is returned as an error. A command nobody handles is
    /// logged by the bus and reported as success.
    async fn dispatch_command(&self, command: Command) -> Result<(), DispatchError>;
}

/// Dispatcher backed by a [`MessageBus`].
#[derive(Clone)]
pub struct BusDispatcher {
    bus: Arc<MessageBus>,
}

impl BusDispatcher {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Dispatcher for BusDispatcher {
    async fn dispatch_command(&self, command: Command) -> Result<(), DispatchError> {
        self.bus.send(command).await.map(|_| ())
    }
}
