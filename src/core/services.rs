//! # TileServices: registry, admission and remote dispatch behind one handle.
//!
//! [`TileServices`] owns the runtime pieces and the background tasks that
//! drive them. It is created by [`TileServicesBuilder`](crate::TileServicesBuilder)
//! and shared as `Arc<TileServices>`.
//!
//! ## High-level architecture
//! ```text
//! add_tile(tile) ──► factory.create ──► Registry.add ──► start_lifecycle ──► recalculate
//! free_tile(id)  ──► Registry.remove ──► post RemoveStatusIcon ──────────────► recalculate
//!
//! remote calls   ──► Dispatcher ──► (verify) ──► manager flags / tile callbacks
//!                                        └─────► DeliveryQueue ──► Shell
//! CommandHandle  ──► CommandLoop ──► AdmissionController / RequestListener
//!
//! Background tasks (all stopped by destroy()):
//!   CommandLoop          command queue ─► admission / listener
//!   delivery worker      side effects  ─► Shell
//!   fan-out listener     Bus.subscribe() ─► SubscriberSet::emit(&Event)
//! ```
//!
//! ## Rules
//! - A tile is visible in every registry table before its lifecycle starts.
//! - Every membership change is followed by a recalculation.
//! - `destroy()` tears every manager down, then stops the background tasks.
//!   It is idempotent.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::admission::{AdmissionController, Allowance};
use crate::core::builder::TileServicesBuilder;
use crate::core::commands::CommandHandle;
use crate::core::dispatcher::Dispatcher;
use crate::core::listener::{ListenOutcome, RequestListener};
use crate::core::registry::{Registration, Registry};
use crate::delivery::{DeliveryQueue, SideEffect};
use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::identity::{ComponentName, TileId};
use crate::subscribers::SubscriberSet;
use crate::tiles::{ManagerFactory, TileRef};

/// Runtime for connection-backed tiles.
pub struct TileServices {
    cfg: Config,
    bus: Bus,
    registry: Arc<Registry>,
    admission: Arc<AdmissionController>,
    listener: Arc<RequestListener>,
    dispatcher: Dispatcher,
    factory: Arc<dyn ManagerFactory>,
    delivery: DeliveryQueue,
    handle: CommandHandle,
    runtime_token: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Pieces assembled by the builder.
pub(crate) struct Parts {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) registry: Arc<Registry>,
    pub(crate) admission: Arc<AdmissionController>,
    pub(crate) listener: Arc<RequestListener>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) factory: Arc<dyn ManagerFactory>,
    pub(crate) delivery: DeliveryQueue,
    pub(crate) handle: CommandHandle,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) workers: Vec<JoinHandle<()>>,
}

impl TileServices {
    /// Returns a builder for configuring the runtime.
    pub fn builder(cfg: Config) -> TileServicesBuilder {
        TileServicesBuilder::new(cfg)
    }

    pub(crate) fn from_parts(parts: Parts) -> Self {
        Self {
            cfg: parts.cfg,
            bus: parts.bus,
            registry: parts.registry,
            admission: parts.admission,
            listener: parts.listener,
            dispatcher: parts.dispatcher,
            factory: parts.factory,
            delivery: parts.delivery,
            handle: parts.handle,
            runtime_token: parts.runtime_token,
            workers: Mutex::new(parts.workers),
        }
    }

    /// Registers `tile`, starts its manager's lifecycle and recalculates allowance.
    ///
    /// A rejected tile is reported as `EventKind::TileAddRejected`; the manager
    /// built for it never starts its lifecycle and is destroyed right away.
    pub async fn add_tile(&self, tile: TileRef) -> Result<Registration, RegistryError> {
        let manager = self.factory.create(&tile);
        let reg = match self.registry.add(tile, manager.clone()).await {
            Ok(reg) => reg,
            Err(e) => {
                manager.handle_destroy();
                tracing::warn!(error = %e, reason = e.as_label(), "tile rejected");
                let mut ev = Event::new(EventKind::TileAddRejected).with_reason(e.as_label());
                if let RegistryError::AlreadyRegistered { identity } = &e {
                    ev = ev.with_tile(identity.component.flatten_to_short_string());
                }
                self.bus.publish(ev);
                return Err(e);
            }
        };

        reg.manager.start_lifecycle_and_add_tile();
        tracing::info!(tile = %reg.tile.identity(), id = %reg.id, "tile added");
        self.bus
            .publish(Event::new(EventKind::TileAdded).with_tile(reg.label()));
        self.admission.recalculate().await;
        Ok(reg)
    }

    /// Frees a tile: tears its manager down, clears its status icon and recalculates.
    ///
    /// Returns `None` if `id` was not registered.
    pub async fn free_tile(&self, id: TileId) -> Option<Registration> {
        let Some(reg) = self.registry.remove(id).await else {
            tracing::debug!(%id, "free of unregistered tile ignored");
            return None;
        };
        self.delivery.post(SideEffect::RemoveStatusIcon {
            slot: reg.tile.component().status_icon_slot().to_string(),
        });
        tracing::info!(tile = %reg.tile.identity(), %id, "tile freed");
        self.bus
            .publish(Event::new(EventKind::TileRemoved).with_tile(reg.label()));
        self.admission.recalculate().await;
        Some(reg)
    }

    /// Enters or leaves reduced-capacity mode.
    pub async fn set_memory_pressure(&self, pressured: bool) -> Allowance {
        self.admission.set_capacity_mode(pressured).await
    }

    /// Recomputes bind allowance for every registered tile.
    pub async fn recalculate(&self) -> Allowance {
        self.admission.recalculate().await
    }

    /// Asks the foreground user's tile for `component` to start listening.
    pub async fn request_listening(&self, component: &ComponentName) -> ListenOutcome {
        self.listener.request_listening(component).await
    }

    /// Remote event surface.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle for submitting commands from outside the runtime.
    pub fn handle(&self) -> CommandHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Subscribes to runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Waits until every side effect posted so far has reached the shell.
    pub async fn flush(&self) {
        self.delivery.flush().await;
    }

    /// Tears down every manager and stops the command loop and workers.
    pub async fn destroy(&self) {
        let mut workers = self.workers.lock().await;
        if self.runtime_token.is_cancelled() {
            return;
        }
        self.registry.destroy_all().await;
        let tiles = self.registry.len().await;
        tracing::info!(tiles, "tile services destroyed");
        self.runtime_token.cancel();
        for worker in workers.drain(..) {
            let _ = worker.await;
        }
    }
}

/// Forwards bus events to the subscriber set until `token` fires.
///
/// Events already queued on the bus at cancellation are still delivered.
pub(crate) fn spawn_fanout(
    bus: &Bus,
    subs: SubscriberSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        subs.emit(&ev);
                    }
                    break;
                }
                ev = rx.recv() => match ev {
                    Ok(ev) => subs.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event fan-out lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        subs.shutdown().await;
    })
}
