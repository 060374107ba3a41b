//! Command Bus and Dispatcher messaging infrastructure.
//!
//! - `MessageBus`: route commands to in-process handlers by type
//! - `Dispatcher`: the capability UI code uses to issue commands
//! - `ConnectionStateObserver`: read-only view of the transport state
//!
//! The transport (in the websocket module) is reached through a handler
//! registered on the bus, see `context::ForwardToTransport`.

pub mod bus;
pub mod connection;
pub mod dispatcher;

pub use bus::{handler_fn, CommandHandler, Delivery, DispatchError, FnHandler, MessageBus};
pub use connection::{ConnectionState, ConnectionStateObserver};
pub use dispatcher::{BusDispatcher, Dispatcher};
