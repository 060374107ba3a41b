//! RandomTalk client messaging core.
//!
//! - `messaging`: command bus, dispatcher and connection state
//! - `websocket`: reconnecting WebSocket transport
//! - `context`: mounts the pieces together for an application
//!
//! The `testing` module (feature `testing`) provides a scripted connector for
//! driving the transport without a network.

pub mod context;
pub mod messaging;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{AppContext, ForwardToTransport, HandlerRegistration};
pub use messaging::{Dispatcher, MessageBus};
pub use websocket::{ClientConfig, TransportClient};
