//! RandomTalk Shared - Types carried by the client messaging core
//!
//! This crate contains the vocabulary shared between the command layer and the
//! WebSocket transport:
//! - The `Command` envelope and its routing key (`CommandType`)
//! - The closed catalog of known command types (`KnownCommand`)
//! - Wire frames (`ClientFrame` outbound, `Notification` inbound)
//! - Payload fixtures for the chat command catalog
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json, uuid, chrono and thiserror
//! 2. **No transport logic** - Pure data types and serialization
//! 3. **Opaque payloads** - The core never interprets `Command::payload`

pub mod chat;
pub mod command;
pub mod messages;

pub use chat::{age_on, split_interests, CreateChatSessionPayload};
pub use command::{Command, CommandError, CommandType, KnownCommand};
pub use messages::{ClientFrame, CommandEnvelope, Notification};
