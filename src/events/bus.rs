//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that any component can publish
//! without blocking, including code paths that hold the registry lock.
//!
//! ```text
//! Publishers (many):                  Subscriber (one):
//!   Admission  ──┐
//!   Dispatcher ──┼──────► Bus ───────► fan-out listener ────► SubscriberSet
//!   Listener   ──┤  (broadcast chan)    (in TileServices)
//!   Delivery   ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - A receiver only observes events sent after it subscribed.
//! - Receivers that fall more than `capacity` events behind get `RecvError::Lagged(n)`.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; every clone publishes into the same ring buffer.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers (fire-and-forget).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
