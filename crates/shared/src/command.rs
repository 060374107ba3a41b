//! Command envelope and routing keys.
//!
//! A `Command` is an application intent: a routing key, an opaque payload and
//! a creation timestamp. The envelope is uniform; only the handler registered
//! for the routing key interprets the payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors raised while constructing or decoding commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The routing key was empty or whitespace only.
    #[error("command type must not be empty")]
    EmptyType,

    /// The payload could not be converted to or from JSON.
    #[error("invalid command payload: {0}")]
    Payload(#[from] serde_json::Error),
}

// =============================================================================
// Command Type
// =============================================================================

/// Routing key of a command.
///
/// Always non-empty. Free-form: any string is a valid type as far as the bus is
/// concerned, see [`KnownCommand`] for the types this application defines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandType(String);

impl CommandType {
    pub fn new(value: impl Into<String>) -> Result<Self, CommandError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CommandError::EmptyType);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The known command this type names, if any.
    pub fn known(&self) -> Option<KnownCommand> {
        KnownCommand::from_type_str(&self.0)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CommandType {
    type Error = CommandError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CommandType {
    type Error = CommandError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommandType> for String {
    fn from(value: CommandType) -> Self {
        value.0
    }
}

impl AsRef<str> for CommandType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Known Commands
// =============================================================================

/// Command types defined by the application.
///
/// Use these at call sites instead of string literals; the bus itself stays
/// keyed by [`CommandType`] so handlers for other types can still be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownCommand {
    /// Ask the chat service to open a session and start matchmaking.
    CreateChatSession,
}

impl KnownCommand {
    pub const ALL: [KnownCommand; 1] = [KnownCommand::CreateChatSession];

    pub fn as_str(self) -> &'static str {
        match self {
            KnownCommand::CreateChatSession => "randomtalk.chat.create_chat_session",
        }
    }

    pub fn from_type_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.as_str() == value)
    }
}

impl fmt::Display for KnownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<KnownCommand> for CommandType {
    fn from(value: KnownCommand) -> Self {
        CommandType(value.as_str().to_string())
    }
}

// =============================================================================
// Command
// =============================================================================

/// An application intent routed by the message bus.
///
/// Immutable once built: the builder-style methods consume and return a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    command_type: CommandType,
    #[serde(default)]
    payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl Command {
    /// Create a command stamped with the current time.
    pub fn new(command_type: impl Into<CommandType>, payload: Value) -> Self {
        Self {
            command_type: command_type.into(),
            payload,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a command without a timestamp.
    ///
    /// The transport stamps such commands with the transmission time.
    pub fn unstamped(command_type: impl Into<CommandType>, payload: Value) -> Self {
        Self {
            command_type: command_type.into(),
            payload,
            timestamp: None,
        }
    }

    /// Create a command from a typed payload.
    pub fn from_payload<T: Serialize>(
        command_type: impl Into<CommandType>,
        payload: &T,
    ) -> Result<Self, CommandError> {
        Ok(Self::new(command_type, serde_json::to_value(payload)?))
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn command_type(&self) -> &CommandType {
        &self.command_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Decode the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        Ok(T::deserialize(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_command_type_is_rejected() {
        assert!(matches!(CommandType::new(""), Err(CommandError::EmptyType)));
        assert!(matches!(CommandType::new("  "), Err(CommandError::EmptyType)));
        assert_eq!(CommandType::new("x").expect("valid").as_str(), "x");
    }

    #[test]
    fn known_command_maps_to_wire_type() {
        let ty = CommandType::from(KnownCommand::CreateChatSession);
        assert_eq!(ty.as_str(), "randomtalk.chat.create_chat_session");
        assert_eq!(ty.known(), Some(KnownCommand::CreateChatSession));
        assert_eq!(
            CommandType::new("randomtalk.chat.unknown").expect("valid").known(),
            None
        );
    }

    #[test]
    fn new_command_is_stamped() {
        let before = Utc::now();
        let cmd = Command::new(KnownCommand::CreateChatSession, json!({}));
        let stamp = cmd.timestamp().expect("stamped");
        assert!(stamp >= before);
    }

    #[test]
    fn deserialize_without_timestamp_leaves_it_unset() {
        let cmd: Command =
            serde_json::from_value(json!({"type": "x", "payload": {"a": 1}})).expect("deserialize");
        assert_eq!(cmd.command_type().as_str(), "x");
        assert_eq!(cmd.payload(), &json!({"a": 1}));
        assert_eq!(cmd.timestamp(), None);
    }

    #[test]
    fn deserialize_rejects_empty_type() {
        let result: Result<Command, _> = serde_json::from_value(json!({"type": ""}));
        assert!(result.is_err());
    }

    #[test]
    fn payload_as_decodes_typed_payload() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Ping {
            seq: u32,
        }

        let cmd = Command::from_payload(CommandType::new("ping").expect("valid"), &Ping { seq: 7 })
            .expect("encode");
        assert_eq!(cmd.payload_as::<Ping>().expect("decode"), Ping { seq: 7 });
        assert!(cmd.payload_as::<Vec<String>>().is_err());
    }
}
