//! # Listening requests for active tiles.
//!
//! An active tile only receives updates when something explicitly asks it to
//! listen. A request names a component; it is resolved for the foreground user
//! and, if the tile is of the active kind, its manager is asked to bind and
//! start listening. Allowance is not touched: the bind still happens only if
//! admission already permits it.

use std::sync::Arc;

use crate::core::registry::Registry;
use crate::events::{Bus, Event, EventKind};
use crate::identity::{ComponentName, TileIdentity};
use crate::platform::UserTracker;

/// What a listening request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    /// No tile for (current user, component).
    NotFound,
    /// Tile resolved but its manager is gone.
    ManagerMissing,
    /// Tile is not of the active kind.
    NotActive,
    /// Bind requested and listening started.
    Requested,
}

/// Resolves and forwards listening requests.
pub struct RequestListener {
    registry: Arc<Registry>,
    users: Arc<dyn UserTracker>,
    bus: Bus,
}

impl RequestListener {
    pub fn new(registry: Arc<Registry>, users: Arc<dyn UserTracker>, bus: Bus) -> Self {
        Self {
            registry,
            users,
            bus,
        }
    }

    /// Asks the tile of `component` for the foreground user to start listening.
    pub async fn request_listening(&self, component: &ComponentName) -> ListenOutcome {
        let identity = TileIdentity::new(self.users.current_user(), component.clone());
        let tables = self.registry.lock().await;

        let Some(id) = tables.tile_for_identity(&identity) else {
            tracing::debug!(tile = %identity, "no tile found for listening request");
            return ListenOutcome::NotFound;
        };
        let Some(reg) = tables.get(id) else {
            tracing::error!(%id, tile = %identity, "no manager found for listening request");
            return ListenOutcome::ManagerMissing;
        };
        if !reg.manager.is_active_tile() {
            return ListenOutcome::NotActive;
        }

        reg.manager.set_bind_requested(true);
        reg.manager.request_listening_start();
        let label = reg.label();
        drop(tables);

        tracing::debug!(tile = %label, "listening requested");
        self.bus
            .publish(Event::new(EventKind::ListeningRequested).with_tile(label));
        ListenOutcome::Requested
    }
}
