//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the registry, admission controller,
//! dispatcher, request listener and delivery queue.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TileServices`, `AdmissionController`, `Dispatcher`,
//!   `RequestListener`, `DeliveryQueue` and `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the fan-out listener spawned by `TileServices`, which forwards
//!   every event to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
