//! # Event subscribers for the tile runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ```text
//!   Dispatcher ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet
//!                                                                     │
//!                                                         ┌───────────┼───────────┐
//!                                                         ▼           ▼           ▼
//!                                                     LogWriter    Metrics     Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use tilevisor::{Event, EventKind, Subscribe};
//!
//! struct RejectCounter;
//!
//! #[async_trait]
//! impl Subscribe for RejectCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::DispatchRejected {
//!             // bump a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "reject-counter" }
//! }
//! ```

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;

pub(crate) use subscriber_set::panic_message;
