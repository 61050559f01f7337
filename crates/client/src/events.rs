//! Subscriber registry for status and message events.
//!
//! Subscribers are notified in registration order. Emission is serialized,
//! so every subscriber sees events in the order the manager raised them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::trace;

use crate::types::Envelope;

/// Callback for connection status changes (`true` when connected).
pub type StatusCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Callback for inbound messages and failure reports.
pub type MessageCallback = Box<dyn Fn(&Envelope) + Send + Sync>;

/// Handle returned by the `subscribe_*` methods, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event delivered to channel subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    StatusChanged(bool),
    Message(Envelope),
}

#[derive(Clone)]
enum Subscriber {
    Status(Arc<StatusCallback>),
    Message(Arc<MessageCallback>),
    Channel(mpsc::UnboundedSender<LinkEvent>),
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    /// Held for the whole fan-out of one event.
    emitting: Mutex<()>,
}

/// Fan-out hub shared by the manager and its background tasks.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_status(&self, cb: StatusCallback) -> SubscriptionId {
        self.register(Subscriber::Status(Arc::new(cb)))
    }

    pub fn subscribe_messages(&self, cb: MessageCallback) -> SubscriptionId {
        self.register(Subscriber::Message(Arc::new(cb)))
    }

    /// Subscribes to both channels through one receiver, keeping their
    /// relative order. Dropping the receiver ends the subscription.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.register(Subscriber::Channel(tx)), rx)
    }

    /// Removes a subscriber. Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    pub(crate) fn emit_status(&self, connected: bool) {
        trace!(connected, "emitting status change");
        self.emit(|sub| match sub {
            Subscriber::Status(cb) => {
                cb(connected);
                true
            }
            Subscriber::Message(_) => true,
            Subscriber::Channel(tx) => tx.send(LinkEvent::StatusChanged(connected)).is_ok(),
        });
    }

    pub(crate) fn emit_message(&self, envelope: Envelope) {
        trace!(kind = ?envelope.kind, len = envelope.text.len(), "emitting envelope");
        self.emit(|sub| match sub {
            Subscriber::Status(_) => true,
            Subscriber::Message(cb) => {
                cb(&envelope);
                true
            }
            Subscriber::Channel(tx) => tx.send(LinkEvent::Message(envelope.clone())).is_ok(),
        });
    }

    /// Runs `deliver` for each subscriber against a snapshot of the
    /// registry, so callbacks may (un)subscribe without deadlocking.
    /// Subscribers for which `deliver` returns `false` are pruned.
    fn emit(&self, deliver: impl Fn(&Subscriber) -> bool) {
        let _order = self
            .inner
            .emitting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.subscribers().clone();

        let dead: Vec<SubscriptionId> = snapshot
            .iter()
            .filter(|(_, sub)| !deliver(sub))
            .map(|(id, _)| *id)
            .collect();

        if !dead.is_empty() {
            self.subscribers().retain(|(id, _)| !dead.contains(id));
            trace!(count = dead.len(), "pruned closed channel subscribers");
        }
    }

    fn register(&self, sub: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers().push((id, sub));
        id
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
