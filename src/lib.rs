//! # tilevisor
//!
//! **Tilevisor** is a runtime for tiles backed by remote connections (quick
//! settings style). It keeps a registry of tiles and their connection managers,
//! decides how many of them may hold a bound connection at once, and routes
//! token-addressed events coming back from those connections after checking
//! who sent them.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Tile     │   │     Tile     │   │     Tile     │
//!     │ (+ manager)  │   │ (+ manager)  │   │ (+ manager)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ add_tile         ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TileServices (facade)                                            │
//! │  - Registry (tile ↔ manager ↔ token ↔ (user, component))          │
//! │  - AdmissionController (capacity 3, or 1 under memory pressure)   │
//! │  - Dispatcher + CallerVerifier (remote event surface)             │
//! │  - RequestListener (listening requests for active tiles)          │
//! │  - CommandLoop (external triggers, in submission order)           │
//! │  - DeliveryQueue (shell side effects, single worker)              │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  set_bind_allowed   tile callbacks     Shell effects         │
//!  (under the lock)   (outside lock)   (delivery worker)       │
//!                                                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                     (capacity: Config::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │    fan-out listener    │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      LogWriter  worker2  workerN
//! ```
//!
//! ### Remote call
//! ```text
//! dispatcher.update_qs_tile(caller, state, token)
//!   ├─► token unknown            ─► debug!, DispatchSkipped, Ok(())
//!   ├─► caller uid ≠ owner uid   ─► warn!,  DispatchRejected, Err(SecurityError)
//!   ├─► lifecycle not started    ─► error!, DispatchSkipped, Ok(())
//!   └─► clear pending bind, stamp last update, tile.update + refresh
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                            |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------------|
//! | **Runtime**       | Register/free tiles, pressure mode, teardown.                 | [`TileServices`], [`TileServicesBuilder`]     |
//! | **Admission**     | Bounded bind allowance, best score first.                     | [`AdmissionController`], [`Allowance`]        |
//! | **Dispatch**      | Token-addressed remote events with caller checks.             | [`Dispatcher`], [`Caller`], [`SecurityError`] |
//! | **Collaborators** | Tiles, managers and platform services you plug in.            | [`Tile`], [`BindingManager`], [`Shell`]       |
//! | **Commands**      | External triggers from any task.                              | [`CommandHandle`], [`Command`]                |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom).          | [`Subscribe`], [`LogWriter`]                  |
//! | **Configuration** | Capacities and queue sizes.                                   | [`Config`]                                    |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::time::SystemTime;
//! use tilevisor::{
//!     BindingManager, ComponentName, Config, LogWriter, ManagerRef, PackageError,
//!     PackageResolver, PendingIntent, Subscribe, Tile, TileRef, TileServices, TileState, Token,
//!     Uid, UserId,
//! };
//!
//! struct Packages;
//!
//! impl PackageResolver for Packages {
//!     fn package_uid(&self, _: &str, _: UserId) -> Result<Uid, PackageError> { Ok(Uid(10_001)) }
//!     fn is_system_package(&self, _: &str, _: UserId) -> Result<bool, PackageError> { Ok(false) }
//! }
//!
//! struct Torch(ComponentName);
//!
//! impl Tile for Torch {
//!     fn component(&self) -> &ComponentName { &self.0 }
//!     fn user(&self) -> UserId { UserId(0) }
//!     fn qs_tile(&self) -> TileState { TileState::default() }
//!     fn update_tile_state(&self, _: TileState, _: Uid) {}
//!     fn refresh_state(&self) {}
//!     fn start_activity_and_collapse(&self, _: PendingIntent) {}
//!     fn start_unlock_and_run(&self) {}
//! }
//!
//! struct Manager { token: Token, allowed: AtomicBool }
//!
//! impl BindingManager for Manager {
//!     fn token(&self) -> Token { self.token }
//!     fn start_lifecycle_and_add_tile(&self) {}
//!     fn set_bind_allowed(&self, allowed: bool) { self.allowed.store(allowed, Ordering::SeqCst) }
//!     fn is_bind_allowed(&self) -> bool { self.allowed.load(Ordering::SeqCst) }
//!     fn set_bind_requested(&self, _: bool) {}
//!     fn calculate_bind_priority(&self, _: SystemTime) {}
//!     fn bind_priority(&self) -> i64 { 0 }
//!     fn handle_destroy(&self) {}
//!     fn is_lifecycle_started(&self) -> bool { true }
//!     fn clear_pending_bind(&self) {}
//!     fn set_last_update(&self, _: SystemTime) {}
//!     fn set_showing_dialog(&self, _: bool) {}
//!     fn is_active_tile(&self) -> bool { false }
//!     fn request_listening_start(&self) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let services = TileServices::builder(Config::default())
//!         .with_subscribers(subs)
//!         .with_package_resolver(Arc::new(Packages))
//!         .with_manager_factory(Arc::new(|_: &TileRef| -> ManagerRef {
//!             Arc::new(Manager { token: Token::generate(), allowed: AtomicBool::new(false) })
//!         }))
//!         .build()?;
//!
//!     let torch = Arc::new(Torch(ComponentName::new("com.example", "com.example.Torch")));
//!     let reg = services.add_tile(torch).await?;
//!     assert!(reg.manager.is_bind_allowed());
//!
//!     services.set_memory_pressure(true).await;
//!     services.free_tile(reg.id).await;
//!     services.destroy().await;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod delivery;
mod error;
mod events;
mod identity;
mod platform;
mod subscribers;
mod tiles;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use crate::core::{
    AdmissionController, Allowance, CallerVerifier, Command, CommandHandle, Dispatcher,
    ListenOutcome, Registration, Registry, RequestListener, TileServices, TileServicesBuilder,
};
pub use config::{Config, DEFAULT_MAX_BOUND, REDUCED_MAX_BOUND};
pub use delivery::{DeliveryQueue, SideEffect};
pub use error::{BuildError, ConfigError, PackageError, RegistryError, SecurityError, SubmitError};
pub use events::{Bus, Event, EventKind};
pub use identity::{Caller, ComponentName, TileId, TileIdentity, Token, Uid, UserId};
pub use platform::{
    CurrentUser, KeyguardState, NoKeyguard, NullShell, PackageResolver, Shell, UserTracker,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tiles::{
    ActiveState, BindingManager, Icon, ManagerFactory, ManagerRef, PendingIntent, StatusIcon,
    Tile, TileRef, TileState,
};
