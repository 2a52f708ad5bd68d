//! # Per-tile connection manager contract.
//!
//! A [`BindingManager`] performs the actual bind/unbind of a tile's remote
//! connection and owns its [`Token`]. The runtime only flips intent flags on it;
//! connection work happens asynchronously inside the implementation.
//!
//! ## Rules
//! - Flag setters are called **while the registry lock is held**: they must not
//!   call back into the runtime or block on I/O.
//! - `token()` must return the same value for the manager's whole lifetime.

use std::sync::Arc;
use std::time::SystemTime;

use crate::identity::Token;
use crate::tiles::tile::TileRef;

/// Connection manager for one registered tile.
pub trait BindingManager: Send + Sync + 'static {
    /// Capability token identifying this manager's session.
    fn token(&self) -> Token;

    /// Starts the connection lifecycle and attaches the tile.
    ///
    /// Called once, after the manager is visible in every registry table.
    fn start_lifecycle_and_add_tile(&self);

    /// Grants or revokes permission to hold a bound connection.
    fn set_bind_allowed(&self, allowed: bool);

    fn is_bind_allowed(&self) -> bool;

    /// Marks that a bind was explicitly requested (e.g. by a listening request).
    fn set_bind_requested(&self, requested: bool);

    /// Recomputes the priority score as of `now`.
    fn calculate_bind_priority(&self, now: SystemTime);

    /// Last score computed by [`calculate_bind_priority`](Self::calculate_bind_priority).
    fn bind_priority(&self) -> i64;

    /// Tears the connection down. The manager is not reused afterwards.
    fn handle_destroy(&self);

    fn is_lifecycle_started(&self) -> bool;

    fn clear_pending_bind(&self);

    fn set_last_update(&self, at: SystemTime);

    fn set_showing_dialog(&self, showing: bool);

    /// Whether the tile is of the "active" kind (updates only on request).
    fn is_active_tile(&self) -> bool;

    /// Asks the connection to begin listening.
    fn request_listening_start(&self);
}

/// Shared handle to a manager.
pub type ManagerRef = Arc<dyn BindingManager>;

/// Creates managers for tiles being added to the runtime.
pub trait ManagerFactory: Send + Sync + 'static {
    fn create(&self, tile: &TileRef) -> ManagerRef;
}

impl<F> ManagerFactory for F
where
    F: Fn(&TileRef) -> ManagerRef + Send + Sync + 'static,
{
    fn create(&self, tile: &TileRef) -> ManagerRef {
        self(tile)
    }
}
