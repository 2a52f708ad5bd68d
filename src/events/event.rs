//! # Runtime events emitted by the tile runtime.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Membership events**: tiles added/removed/rejected
//! - **Admission events**: capacity switches and allowance recalculations
//! - **Dispatch events**: rejected or skipped remote calls, listening requests
//! - **Delivery events**: side-effect queue and subscriber worker health
//!
//! The [`Event`] struct carries the optional metadata for each kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use tilevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DispatchRejected)
//!     .with_tile("com.example/.Wifi")
//!     .with_reason("security_owner_mismatch");
//!
//! assert_eq!(ev.kind, EventKind::DispatchRejected);
//! assert_eq!(ev.tile.as_deref(), Some("com.example/.Wifi"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `tile`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `tile`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Membership events ===
    /// Tile registered in every table and its lifecycle started.
    ///
    /// Sets:
    /// - `tile`: short component name
    TileAdded,

    /// Tile registration refused.
    ///
    /// Sets:
    /// - `tile`: short component name
    /// - `reason`: registry error label
    TileAddRejected,

    /// Tile removed from every table and its manager destroyed.
    ///
    /// Sets:
    /// - `tile`: short component name
    TileRemoved,

    // === Admission events ===
    /// Memory pressure mode switched.
    ///
    /// Sets:
    /// - `capacity`: new capacity
    /// - `reason`: "pressure" or "normal"
    CapacityChanged,

    /// Bind allowance recomputed.
    ///
    /// Sets:
    /// - `capacity`: capacity in force
    /// - `allowed`: managers allowed to bind
    /// - `total`: managers registered
    AllowanceRecalculated,

    // === Dispatch events ===
    /// Remote call refused by caller verification.
    ///
    /// Sets:
    /// - `tile`: short component name
    /// - `reason`: security error label
    DispatchRejected,

    /// Remote call dropped without effect (unknown token or inconsistent state).
    ///
    /// Sets:
    /// - `tile`: short component name, when the token resolved
    /// - `reason`: skip label
    DispatchSkipped,

    /// An active tile was asked to start listening.
    ///
    /// Sets:
    /// - `tile`: short component name
    ListeningRequested,

    // === Delivery events ===
    /// Side effect dropped because the delivery queue was full or closed.
    ///
    /// Sets:
    /// - `reason`: effect label and cause
    DeliveryOverflow,

    /// Shell panicked while applying a side effect.
    ///
    /// Sets:
    /// - `reason`: panic message
    DeliveryPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Short component name of the tile (or subscriber name), if applicable.
    pub tile: Option<Arc<str>>,
    /// Machine-readable reason (labels, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Capacity in force.
    pub capacity: Option<u32>,
    /// Number of managers allowed to bind.
    pub allowed: Option<u32>,
    /// Number of registered managers.
    pub total: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            tile: None,
            reason: None,
            capacity: None,
            allowed: None,
            total: None,
        }
    }

    #[inline]
    pub fn with_tile(mut self, tile: impl Into<Arc<str>>) -> Self {
        self.tile = Some(tile.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(clamp_u32(capacity));
        self
    }

    /// Attaches allowance counts.
    #[inline]
    pub fn with_allowance(mut self, allowed: usize, total: usize) -> Self {
        self.allowed = Some(clamp_u32(allowed));
        self.total = Some(clamp_u32(total));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_tile(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_tile(subscriber)
            .with_reason(info)
    }
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
