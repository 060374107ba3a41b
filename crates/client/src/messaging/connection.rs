//! Connection lifecycle state.
//!
//! The transport client publishes its state into a shared atomic so UI code can
//! observe it without touching the connection itself.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Connection state of the transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never connected
    #[default]
    Idle,
    /// Attempting to establish connection
    Connecting,
    /// Connected; commands can be sent
    Open,
    /// Close requested, waiting for the connection to wind down
    Closing,
    /// Closed, either explicitly or after a drop
    Closed,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Closing => 3,
            ConnectionState::Closed => 4,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Closing,
            4 => ConnectionState::Closed,
            _ => ConnectionState::Idle,
        }
    }

    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }
}

/// Observable connection state for UI binding.
///
/// Multiple observers can share the same underlying state.
#[derive(Clone, Debug)]
pub struct ConnectionStateObserver {
    state: Arc<AtomicU8>,
}

impl ConnectionStateObserver {
    pub fn new(state: Arc<AtomicU8>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }
}

/// Internal helper to update connection state (used by the transport client).
pub(crate) fn set_connection_state(state_ref: &AtomicU8, new_state: ConnectionState) {
    state_ref.store(new_state.to_u8(), Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_discriminant_reads_as_idle() {
        assert_eq!(ConnectionState::from_u8(200), ConnectionState::Idle);
        assert_eq!(
            ConnectionState::from_u8(ConnectionState::Closing.to_u8()),
            ConnectionState::Closing
        );
    }

    #[test]
    fn test_observer_reads_state() {
        let state = Arc::new(AtomicU8::new(ConnectionState::Idle.to_u8()));
        let observer = ConnectionStateObserver::new(Arc::clone(&state));

        assert_eq!(observer.state(), ConnectionState::Idle);
        assert!(!observer.is_open());

        set_connection_state(&state, ConnectionState::Open);

        assert_eq!(observer.state(), ConnectionState::Open);
        assert!(observer.is_open());
    }
}
