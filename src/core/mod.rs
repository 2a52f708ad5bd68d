//! Runtime core: registration, admission and remote dispatch.
//!
//! The public entry point is [`TileServices`], built by [`TileServicesBuilder`].
//! The pieces it wires together are exported for callers that need them
//! directly (e.g. the dispatcher for a transport layer).
//!
//! Internal modules:
//! - [`registry`]: three-way index of registered tiles under one lock;
//! - [`admission`]: grants bind allowance to the best-ranked managers;
//! - [`verifier`]: authenticates remote callers against a tile's owner;
//! - [`dispatcher`]: token-addressed remote event surface;
//! - [`listener`]: listening requests for active tiles;
//! - [`commands`]: external command channel and its loop;
//! - [`services`]: the facade and its background tasks;
//! - [`builder`]: assembles the facade from config and collaborators.

mod admission;
mod builder;
mod commands;
mod dispatcher;
mod listener;
mod registry;
mod services;
mod verifier;

pub use admission::{AdmissionController, Allowance};
pub use builder::TileServicesBuilder;
pub use commands::{Command, CommandHandle};
pub use dispatcher::Dispatcher;
pub use listener::{ListenOutcome, RequestListener};
pub use registry::{Registration, Registry};
pub use services::TileServices;
pub use verifier::CallerVerifier;
