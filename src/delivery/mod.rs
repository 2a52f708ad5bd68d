//! # Single-worker delivery of shell side effects.
//!
//! Effects that touch the shell (panel collapse, status icons) are never run on
//! the caller's context or under the registry lock. They are posted to a bounded
//! queue drained by one worker task, which applies them in posting order.
//!
//! ```text
//! Dispatcher ──post(effect)──► [bounded queue] ──► worker ──► Shell
//! TileServices ──┘                                    └─► panic → DeliveryPanicked
//! ```
//!
//! - [`SideEffect`]: the effects the runtime produces
//! - [`DeliveryQueue`]: cloneable posting handle plus the worker

mod effect;
mod queue;

pub use effect::SideEffect;
pub use queue::DeliveryQueue;
