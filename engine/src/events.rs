//! Session-change notifications.
//!
//! Every mutating engine call publishes a [`SessionEvent`] immediately after
//! it completes. Events carry snapshots, never live references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::model::{Operation, Session};

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What changed in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionChangeKind {
    /// The session was created.
    Created,
    /// Session-level fields or an operation list changed.
    Updated,
    /// An operation was appended.
    OperationAdded,
    /// An operation's status or hunks changed.
    OperationUpdated,
    /// Apply or revert finished.
    Completed,
    /// The session was cancelled, or an apply applied nothing.
    Cancelled,
}

impl fmt::Display for SessionChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::OperationAdded => write!(f, "operation_added"),
            Self::OperationUpdated => write!(f, "operation_updated"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A notification about one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// Snapshot of the session after the change.
    pub session: Session,
    /// What changed.
    pub change: SessionChangeKind,
    /// The operation concerned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

/// Errors returned when receiving events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// The publisher was dropped.
    #[error("Event channel closed")]
    ChannelClosed,
    /// The receiver fell behind and missed events.
    #[error("Receiver lagged, {0} events skipped")]
    Lagged(u64),
}

/// Publishes session events to every current subscriber.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> EventReceiver {
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        debug!(subscribers = self.subscriber_count(), "Event subscriber added");
        EventReceiver {
            inner: self.sender.subscribe(),
            subscriber_count: Arc::clone(&self.subscriber_count),
        }
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) {
        let change = event.change;
        let session_id = event.session.id.clone();
        match self.sender.send(event) {
            Ok(receivers) => trace!(%session_id, %change, receivers, "Session event sent"),
            Err(_) => trace!(%session_id, %change, "Session event dropped, no subscribers"),
        }
    }

    /// Convenience wrapper building and publishing an event.
    pub fn emit(&self, session: &Session, change: SessionChangeKind, operation: Option<&Operation>) {
        self.publish(SessionEvent {
            session: session.clone(),
            change,
            operation: operation.cloned(),
        });
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Receiving half of an [`EventBroadcaster`] subscription.
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<SessionEvent>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Waits for the next event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::ChannelClosed`] once the broadcaster is gone, or
    /// [`EventError::Lagged`] if events were dropped for this receiver.
    pub async fn recv(&mut self) -> Result<SessionEvent, EventError> {
        self.inner.recv().await.map_err(map_recv_error)
    }

    /// Returns the next event if one is already queued.
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` when the queue is empty and an error if the channel
    /// closed or lagged.
    pub fn try_recv(&mut self) -> Result<Option<SessionEvent>, EventError> {
        match self.inner.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(EventError::ChannelClosed),
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                warn!(skipped = count, "Event receiver lagged");
                Err(EventError::Lagged(count))
            }
        }
    }

    /// Drains every queued event.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventError {
    match e {
        broadcast::error::RecvError::Closed => EventError::ChannelClosed,
        broadcast::error::RecvError::Lagged(count) => {
            warn!(skipped = count, "Event receiver lagged");
            EventError::Lagged(count)
        }
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        debug!(
            subscribers = self.subscriber_count.load(Ordering::SeqCst),
            "Event subscriber removed"
        );
    }
}
