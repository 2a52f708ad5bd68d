//! # Tile abstraction.
//!
//! This module defines the [`Tile`] trait: the capability surface the registry
//! and dispatcher need from a concrete tile kind. The common handle type is
//! [`TileRef`], an `Arc<dyn Tile>` suitable for sharing across the runtime.
//!
//! All methods are called **outside** the registry lock, so implementations may
//! call back into the runtime.

use std::sync::Arc;

use crate::identity::{ComponentName, TileIdentity, Uid, UserId};
use crate::tiles::state::{PendingIntent, TileState};

/// # Logical tile backed by a remote connection.
///
/// # Example
/// ```
/// use std::sync::Mutex;
/// use tilevisor::{ComponentName, PendingIntent, Tile, TileState, Uid, UserId};
///
/// struct Torch {
///     component: ComponentName,
///     state: Mutex<TileState>,
/// }
///
/// impl Tile for Torch {
///     fn component(&self) -> &ComponentName { &self.component }
///     fn user(&self) -> UserId { UserId(0) }
///     fn qs_tile(&self) -> TileState { self.state.lock().unwrap().clone() }
///     fn update_tile_state(&self, state: TileState, _uid: Uid) {
///         *self.state.lock().unwrap() = state;
///     }
///     fn refresh_state(&self) {}
///     fn start_activity_and_collapse(&self, _intent: PendingIntent) {}
///     fn start_unlock_and_run(&self) {}
/// }
/// ```
pub trait Tile: Send + Sync + 'static {
    /// Component providing this tile.
    fn component(&self) -> &ComponentName;

    /// User the tile belongs to.
    fn user(&self) -> UserId;

    /// Returns `(user, component)`.
    fn identity(&self) -> TileIdentity {
        TileIdentity::new(self.user(), self.component().clone())
    }

    /// Stable spec string used in diagnostics.
    fn tile_spec(&self) -> String {
        format!("custom({})", self.component().flatten_to_short_string())
    }

    /// Current state, as last applied.
    fn qs_tile(&self) -> TileState;

    /// Applies a state pushed by the connection running as `uid`.
    fn update_tile_state(&self, state: TileState, uid: Uid);

    /// Re-renders the tile from its current state.
    fn refresh_state(&self);

    fn on_dialog_shown(&self) {}

    fn on_dialog_hidden(&self) {}

    /// Launches `intent` and collapses the panel.
    fn start_activity_and_collapse(&self, intent: PendingIntent);

    /// Asks for the device to be unlocked, then runs the tile's click action.
    fn start_unlock_and_run(&self);
}

/// Shared handle to a tile.
pub type TileRef = Arc<dyn Tile>;
