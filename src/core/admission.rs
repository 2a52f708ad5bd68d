//! # Bind admission under a pressure-dependent capacity.
//!
//! The controller decides which registered managers may hold a bound
//! connection. At most `capacity` managers are allowed at once; capacity is
//! `normal_capacity`, or `reduced_capacity` while memory pressure is signalled.
//!
//! ## Recalculation
//! ```text
//! lock(registry)
//!   ├─► managers in registration order
//!   ├─► if N > capacity:
//!   │     ├─ manager.calculate_bind_priority(now)   (each)
//!   │     └─ stable sort by bind_priority, descending
//!   ├─► set_bind_allowed(false) for ranks >= capacity
//!   └─► set_bind_allowed(true)  for ranks <  capacity
//! unlock
//! ```
//!
//! ## Invariants
//! - Never more than `capacity` managers allowed, also mid-recalculation
//!   (revocations are applied before grants).
//! - Equal scores keep registration order.
//! - Only intent flags are flipped; binding work stays inside the managers.
//! - The pressure mode lives under the registry lock, so a mode switch and a
//!   membership change are never interleaved within one recalculation.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::Config;
use crate::core::registry::{Registration, Registry, Tables};
use crate::events::{Bus, Event, EventKind};
use crate::identity::TileId;

/// Outcome of one recalculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowance {
    /// Capacity in force.
    pub capacity: usize,
    /// Tiles allowed to bind: best first when ranked, registration order otherwise.
    pub allowed: Vec<TileId>,
    /// Tiles denied, best first. Empty unless the tiles outnumber `capacity`.
    pub denied: Vec<TileId>,
}

/// Grants and revokes bind allowance.
pub struct AdmissionController {
    registry: Arc<Registry>,
    cfg: Config,
    bus: Bus,
}

impl AdmissionController {
    pub fn new(registry: Arc<Registry>, cfg: &Config, bus: Bus) -> Self {
        Self {
            registry,
            cfg: cfg.clone(),
            bus,
        }
    }

    /// Switches between normal and reduced capacity, then recalculates.
    pub async fn set_capacity_mode(&self, pressured: bool) -> Allowance {
        let mut tables = self.registry.lock().await;
        if tables.pressured != pressured {
            tables.pressured = pressured;
            let capacity = self.cfg.capacity(pressured);
            tracing::info!(pressured, capacity, "bind capacity changed");
            self.bus.publish(
                Event::new(EventKind::CapacityChanged)
                    .with_capacity(capacity)
                    .with_reason(if pressured { "pressure" } else { "normal" }),
            );
        }
        self.recalculate_locked(&tables, SystemTime::now())
    }

    /// Recomputes bind allowance for every registered manager.
    pub async fn recalculate(&self) -> Allowance {
        let tables = self.registry.lock().await;
        self.recalculate_locked(&tables, SystemTime::now())
    }

    /// Capacity currently in force.
    pub async fn capacity(&self) -> usize {
        let tables = self.registry.lock().await;
        self.cfg.capacity(tables.pressured)
    }

    pub async fn is_pressured(&self) -> bool {
        self.registry.lock().await.pressured
    }

    fn recalculate_locked(&self, tables: &Tables, now: SystemTime) -> Allowance {
        let capacity = self.cfg.capacity(tables.pressured);
        let mut ranked: Vec<&Registration> = tables.registrations().collect();
        rank(&mut ranked, capacity, now);

        let split = capacity.min(ranked.len());
        let (allowed, denied) = ranked.split_at(split);
        for reg in denied {
            reg.manager.set_bind_allowed(false);
        }
        for reg in allowed {
            reg.manager.set_bind_allowed(true);
        }

        tracing::debug!(capacity, allowed = allowed.len(), total = ranked.len(), "bind allowance recalculated");
        self.bus.publish(
            Event::new(EventKind::AllowanceRecalculated)
                .with_capacity(capacity)
                .with_allowance(allowed.len(), ranked.len()),
        );

        Allowance {
            capacity,
            allowed: allowed.iter().map(|r| r.id).collect(),
            denied: denied.iter().map(|r| r.id).collect(),
        }
    }
}

/// Orders `regs` best-first when they exceed `capacity`.
///
/// Under capacity the order is left as is: everyone is allowed, so scores are
/// not recomputed.
fn rank(regs: &mut [&Registration], capacity: usize, now: SystemTime) {
    if regs.len() <= capacity {
        return;
    }
    for reg in regs.iter() {
        reg.manager.calculate_bind_priority(now);
    }
    regs.sort_by_key(|reg| Reverse(reg.manager.bind_priority()));
}
