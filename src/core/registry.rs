//! # Tile registry - three-way index of registered tiles.
//!
//! The registry is the source of truth mapping a tile object to its binding
//! manager, and its `(user, component)` identity and manager token back to the
//! tile object.
//!
//! ## Architecture
//! ```text
//!                 ┌──────────────── Mutex<Tables> ────────────────┐
//!                 │ services: TileId ─► Registration{tile, manager}│
//!                 │ tiles:    (user, component) ─► TileId          │
//!                 │ tokens:   Token ─► TileId                      │
//!                 │ pressured: bool                                │
//!                 └────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - The three maps are only ever mutated together, under the one lock.
//! - A lookup never observes a half-inserted or half-removed tile.
//! - `services` iterates in registration order, which is the tie-break order
//!   used by admission.
//! - Only manager flag setters and `handle_destroy` run under the lock; tile
//!   callbacks and shell effects never do.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::RegistryError;
use crate::identity::{ComponentName, TileId, TileIdentity, Token, UserId};
use crate::tiles::{ManagerRef, TileRef};

/// A registered tile together with its manager.
#[derive(Clone)]
pub struct Registration {
    /// Handle of the tile object.
    pub id: TileId,
    pub tile: TileRef,
    pub manager: ManagerRef,
}

impl Registration {
    /// Short component name, for diagnostics and events.
    pub fn label(&self) -> String {
        self.tile.component().flatten_to_short_string()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("identity", &self.tile.identity())
            .finish_non_exhaustive()
    }
}

/// Lock-protected registry state.
pub(crate) struct Tables {
    services: BTreeMap<TileId, Registration>,
    tiles: HashMap<TileIdentity, TileId>,
    tokens: HashMap<Token, TileId>,
    /// Memory pressure mode; read and written only by admission.
    pub(crate) pressured: bool,
}

impl Tables {
    fn new() -> Self {
        Self {
            services: BTreeMap::new(),
            tiles: HashMap::new(),
            tokens: HashMap::new(),
            pressured: false,
        }
    }

    fn insert(&mut self, tile: TileRef, manager: ManagerRef) -> Result<Registration, RegistryError> {
        let identity = tile.identity();
        if self.tiles.contains_key(&identity) {
            return Err(RegistryError::AlreadyRegistered { identity });
        }
        let token = manager.token();
        if let Some(holder) = self.tokens.get(&token).and_then(|id| self.services.get(id)) {
            return Err(RegistryError::TokenCollision {
                holder: holder.tile.component().clone(),
            });
        }

        let reg = Registration {
            id: TileId::next(),
            tile,
            manager,
        };
        self.services.insert(reg.id, reg.clone());
        self.tiles.insert(identity, reg.id);
        self.tokens.insert(token, reg.id);
        Ok(reg)
    }

    fn take(&mut self, id: TileId) -> Option<Registration> {
        let reg = self.services.remove(&id)?;
        self.tokens.remove(&reg.manager.token());
        self.tiles.remove(&reg.tile.identity());
        Some(reg)
    }

    /// Registration of a tile object, if still registered.
    pub(crate) fn get(&self, id: TileId) -> Option<&Registration> {
        self.services.get(&id)
    }

    pub(crate) fn tile_for_token(&self, token: &Token) -> Option<TileId> {
        self.tokens.get(token).copied()
    }

    pub(crate) fn tile_for_identity(&self, identity: &TileIdentity) -> Option<TileId> {
        self.tiles.get(identity).copied()
    }

    /// Registrations in registration order.
    pub(crate) fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.services.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.services.len()
    }
}

/// Three-way index of registered tiles.
pub struct Registry {
    tables: Mutex<Tables>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tables: Mutex::new(Tables::new()),
        })
    }

    /// Acquires the registry-wide lock.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().await
    }

    /// Inserts a tile and its manager into all three tables.
    ///
    /// The caller starts the manager's lifecycle once this returns, so token
    /// lookups are consistent before any inbound event can carry the token.
    pub async fn add(
        &self,
        tile: TileRef,
        manager: ManagerRef,
    ) -> Result<Registration, RegistryError> {
        self.lock().await.insert(tile, manager)
    }

    /// Marks the manager non-bindable, tears it down and deletes it from all three tables.
    ///
    /// Returns `None` if the tile was not registered.
    pub async fn remove(&self, id: TileId) -> Option<Registration> {
        let mut tables = self.lock().await;
        let reg = tables.take(id)?;
        reg.manager.set_bind_allowed(false);
        reg.manager.handle_destroy();
        Some(reg)
    }

    pub async fn get(&self, id: TileId) -> Option<Registration> {
        self.lock().await.get(id).cloned()
    }

    /// Resolves a token to its registration.
    pub async fn lookup_by_token(&self, token: Token) -> Option<Registration> {
        let tables = self.lock().await;
        tables
            .tile_for_token(&token)
            .and_then(|id| tables.get(id))
            .cloned()
    }

    /// Resolves a `(user, component)` pair to its registration.
    pub async fn lookup_by_identity(
        &self,
        user: UserId,
        component: &ComponentName,
    ) -> Option<Registration> {
        let tables = self.lock().await;
        let identity = TileIdentity::new(user, component.clone());
        tables
            .tile_for_identity(&identity)
            .and_then(|id| tables.get(id))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lock().await.len() == 0
    }

    /// Registrations in registration order.
    pub async fn snapshot(&self) -> Vec<Registration> {
        self.lock().await.registrations().cloned().collect()
    }

    /// `[token:component:user,...]` listing used when a lookup misses.
    pub async fn available_tiles(&self) -> String {
        let tables = self.lock().await;
        let mut out = String::from("[");
        for (token, id) in &tables.tokens {
            if let Some(reg) = tables.get(*id) {
                let _ = write!(
                    out,
                    "{token}:{}:{},",
                    reg.tile.component().flatten_to_short_string(),
                    reg.tile.user()
                );
            }
        }
        out.push(']');
        out
    }

    /// Tears down every registered manager. Tables are left intact.
    pub async fn destroy_all(&self) {
        let tables = self.lock().await;
        for reg in tables.registrations() {
            reg.manager.handle_destroy();
        }
    }
}
