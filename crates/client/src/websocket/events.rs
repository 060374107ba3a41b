//! Transport lifecycle notifications.
//!
//! The transport client reports to exactly one [`TransportObserver`]. Setting a
//! new observer replaces the previous one. Two ready-made observers are
//! provided: [`Callbacks`] (closures) and [`ChannelObserver`] (an mpsc stream of
//! [`TransportEvent`]s for a single consumer).

use std::fmt;
use std::sync::Arc;

use randomtalk_shared::Notification;
use tokio::sync::mpsc;

use super::shared::{CloseEvent, TransportError};

/// Receives connection lifecycle events and inbound notifications.
///
/// Called from the connection task; implementations must not block.
pub trait TransportObserver: Send + Sync {
    fn on_open(&self) {}

    fn on_close(&self, _event: &CloseEvent) {}

    fn on_error(&self, _error: &TransportError) {}

    fn on_notification(&self, _notification: Notification) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransportObserver for NoopObserver {}

// =============================================================================
// Callbacks
// =============================================================================

type OpenFn = Arc<dyn Fn() + Send + Sync>;
type CloseFn = Arc<dyn Fn(&CloseEvent) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&TransportError) + Send + Sync>;
type NotificationFn = Arc<dyn Fn(Notification) + Send + Sync>;

/// Closure-based observer. Unset callbacks are skipped.
#[derive(Default, Clone)]
pub struct Callbacks {
    on_open: Option<OpenFn>,
    on_close: Option<CloseFn>,
    on_error: Option<ErrorFn>,
    on_notification: Option<NotificationFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    pub fn with_on_close(mut self, f: impl Fn(&CloseEvent) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    pub fn with_on_error(mut self, f: impl Fn(&TransportError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn with_on_notification(
        mut self,
        f: impl Fn(Notification) + Send + Sync + 'static,
    ) -> Self {
        self.on_notification = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_notification", &self.on_notification.is_some())
            .finish()
    }
}

impl TransportObserver for Callbacks {
    fn on_open(&self) {
        if let Some(ref cb) = self.on_open {
            cb();
        }
    }

    fn on_close(&self, event: &CloseEvent) {
        if let Some(ref cb) = self.on_close {
            cb(event);
        }
    }

    fn on_error(&self, error: &TransportError) {
        if let Some(ref cb) = self.on_error {
            cb(error);
        }
    }

    fn on_notification(&self, notification: Notification) {
        if let Some(ref cb) = self.on_notification {
            cb(notification);
        }
    }
}

// =============================================================================
// Channel sink
// =============================================================================

/// Lifecycle event as delivered through a [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Closed(CloseEvent),
    Error(TransportError),
    Notification(Notification),
}

/// Observer forwarding every event into an unbounded channel.
///
/// Events are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: TransportEvent) {
        let _ = self.tx.send(event);
    }
}

impl TransportObserver for ChannelObserver {
    fn on_open(&self) {
        self.emit(TransportEvent::Opened);
    }

    fn on_close(&self, event: &CloseEvent) {
        self.emit(TransportEvent::Closed(event.clone()));
    }

    fn on_error(&self, error: &TransportError) {
        self.emit(TransportEvent::Error(error.clone()));
    }

    fn on_notification(&self, notification: Notification) {
        self.emit(TransportEvent::Notification(notification));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn callbacks_invoke_only_configured_closures() {
        let opens = Arc::new(AtomicU32::new(0));
        let opens_clone = Arc::clone(&opens);
        let callbacks = Callbacks::new().with_on_open(move || {
            opens_clone.fetch_add(1, Ordering::SeqCst);
        });

        callbacks.on_open();
        callbacks.on_close(&CloseEvent::normal());
        callbacks.on_notification(Notification::Raw("x".into()));

        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn channel_observer_preserves_order() {
        let (observer, mut rx) = ChannelObserver::channel();
        observer.on_open();
        observer.on_notification(Notification::Raw("hi".into()));
        observer.on_close(&CloseEvent::abnormal("gone"));

        assert_eq!(rx.try_recv().ok(), Some(TransportEvent::Opened));
        assert_eq!(
            rx.try_recv().ok(),
            Some(TransportEvent::Notification(Notification::Raw("hi".into())))
        );
        assert!(matches!(rx.try_recv(), Ok(TransportEvent::Closed(e)) if e.code == 1006));
    }

    #[test]
    fn channel_observer_tolerates_dropped_receiver() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_open();
    }
}
