//! WebSocket transport to the chat server.
//!
//! - `client`: reconnecting `TransportClient`
//! - `connector`: connection factory seam, tokio-tungstenite by default
//! - `core`: linear reconnect policy
//! - `events`: observer trait and ready-made observers
//! - `shared`: frame and error vocabulary

mod client;
mod config;
mod connector;
mod core;
mod events;
mod shared;

pub use client::TransportClient;
pub use config::{
    ClientConfig, ConfigError, ENV_WS_MAX_RETRIES, ENV_WS_PROTOCOLS, ENV_WS_RECONNECT_DELAY_MS,
    ENV_WS_URL,
};
pub use connector::{
    build_request, Connection, Connector, FrameSink, FrameStream, TungsteniteConnector,
};
pub use self::core::ReconnectPolicy;
pub use events::{Callbacks, ChannelObserver, NoopObserver, TransportEvent, TransportObserver};
pub use shared::{
    parse_inbound, CloseEvent, Frame, TransportError, CLOSE_ABNORMAL, CLOSE_NORMAL,
    DEFAULT_MAX_RETRIES, DEFAULT_RECONNECT_DELAY_MS,
};
