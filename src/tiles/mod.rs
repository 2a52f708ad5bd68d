//! # Tile abstractions and connection-manager contract.
//!
//! This module provides the tile-related types the runtime depends on:
//! - [`Tile`] - trait implemented by every concrete tile kind
//! - [`TileRef`] - shared reference to a tile (`Arc<dyn Tile>`)
//! - [`BindingManager`] - per-tile connection manager contract
//! - [`ManagerFactory`] - creates a manager for a newly added tile
//! - [`TileState`], [`Icon`], [`PendingIntent`] - payloads carried by remote events

mod manager;
mod state;
mod tile;

pub use manager::{BindingManager, ManagerFactory, ManagerRef};
pub use state::{ActiveState, Icon, PendingIntent, StatusIcon, TileState};
pub use tile::{Tile, TileRef};
