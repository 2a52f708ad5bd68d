//! # Token-addressed dispatch of remote tile events.
//!
//! Every inbound call from a tile's remote connection carries the manager's
//! [`Token`]. The dispatcher resolves the token, authenticates the caller and
//! only then applies the event.
//!
//! ## Flow
//! ```text
//! call(caller, token, ..)
//!   ├─► registry.lookup_by_token(token) ── miss ──► Skip::UnknownToken (debug), Ok
//!   ├─► verifier.verify(component, caller) ── fail ──► Err(SecurityError)
//!   ├─► lock: re-check manager, mutate flags ── inconsistent ──► Skip (error), Ok
//!   └─► unlock: tile callbacks, post shell effects
//! ```
//!
//! ## Rules
//! - A security failure aborts before any state is touched.
//! - Unknown tokens and inconsistent state never surface as errors.
//! - Tile callbacks run outside the registry lock; shell effects go through the
//!   delivery queue.

use std::sync::Arc;
use std::time::SystemTime;

use crate::core::registry::{Registration, Registry};
use crate::core::verifier::CallerVerifier;
use crate::delivery::{DeliveryQueue, SideEffect};
use crate::error::SecurityError;
use crate::events::{Bus, Event, EventKind};
use crate::identity::{Caller, Token, Uid};
use crate::platform::{KeyguardState, PackageResolver};
use crate::tiles::{BindingManager, Icon, PendingIntent, StatusIcon, TileState};

/// Why a call was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    /// Token does not belong to a registered tile.
    UnknownToken,
    /// Tile was freed between token resolution and the state update.
    ManagerMissing,
    /// Manager has not started its lifecycle yet.
    LifecycleNotStarted,
}

impl Skip {
    fn as_label(self) -> &'static str {
        match self {
            Skip::UnknownToken => "unknown_token",
            Skip::ManagerMissing => "manager_missing",
            Skip::LifecycleNotStarted => "lifecycle_not_started",
        }
    }
}

/// Remote event surface of the runtime.
pub struct Dispatcher {
    registry: Arc<Registry>,
    verifier: CallerVerifier,
    packages: Arc<dyn PackageResolver>,
    keyguard: Arc<dyn KeyguardState>,
    delivery: DeliveryQueue,
    bus: Bus,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        packages: Arc<dyn PackageResolver>,
        keyguard: Arc<dyn KeyguardState>,
        delivery: DeliveryQueue,
        bus: Bus,
    ) -> Self {
        Self {
            registry,
            verifier: CallerVerifier::new(packages.clone()),
            packages,
            keyguard,
            delivery,
            bus,
        }
    }

    /// Applies a tile state pushed by the connection.
    pub async fn update_qs_tile(
        &self,
        caller: Caller,
        state: TileState,
        token: Token,
    ) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "update_qs_tile").await else {
            return Ok(());
        };
        let uid = self.authorize(&reg, caller)?;
        let started = self
            .with_started_manager(&reg, "update_qs_tile", |manager| {
                manager.clear_pending_bind();
                manager.set_last_update(SystemTime::now());
            })
            .await;
        if started {
            reg.tile.update_tile_state(state, uid);
            reg.tile.refresh_state();
        }
        Ok(())
    }

    /// Connection reports a successful bind.
    pub async fn on_start_successful(&self, caller: Caller, token: Token) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "on_start_successful").await else {
            return Ok(());
        };
        self.authorize(&reg, caller)?;
        let started = self
            .with_started_manager(&reg, "on_start_successful", |manager| {
                manager.clear_pending_bind();
            })
            .await;
        if started {
            reg.tile.refresh_state();
        }
        Ok(())
    }

    /// Connection shows a dialog: mark it and collapse the panel.
    pub async fn on_show_dialog(&self, caller: Caller, token: Token) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "on_show_dialog").await else {
            return Ok(());
        };
        self.authorize(&reg, caller)?;
        if self
            .with_manager(&reg, "on_show_dialog", |manager| manager.set_showing_dialog(true))
            .await
        {
            reg.tile.on_dialog_shown();
            self.delivery.post(SideEffect::CollapsePanels);
        }
        Ok(())
    }

    pub async fn on_dialog_hidden(&self, caller: Caller, token: Token) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "on_dialog_hidden").await else {
            return Ok(());
        };
        self.authorize(&reg, caller)?;
        if self
            .with_manager(&reg, "on_dialog_hidden", |manager| manager.set_showing_dialog(false))
            .await
        {
            reg.tile.on_dialog_hidden();
        }
        Ok(())
    }

    /// Connection is about to start an activity itself: collapse the panel.
    pub async fn on_start_activity(&self, caller: Caller, token: Token) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "on_start_activity").await else {
            return Ok(());
        };
        self.authorize(&reg, caller)?;
        self.delivery.post(SideEffect::CollapsePanels);
        Ok(())
    }

    /// Launches `intent` on behalf of the tile and collapses the panel.
    pub async fn start_activity(
        &self,
        caller: Caller,
        token: Token,
        intent: PendingIntent,
    ) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "start_activity").await else {
            return Ok(());
        };
        self.authorize(&reg, caller)?;
        reg.tile.start_activity_and_collapse(intent);
        Ok(())
    }

    /// Sets (or clears, with `None`) the status icon of a system tile.
    ///
    /// Non-system packages are ignored; package lookup failures are swallowed.
    pub async fn update_status_icon(
        &self,
        caller: Caller,
        token: Token,
        icon: Option<Icon>,
        content_description: Option<String>,
    ) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "update_status_icon").await else {
            return Ok(());
        };
        self.authorize(&reg, caller)?;

        let component = reg.tile.component();
        let package = component.package();
        match self.packages.is_system_package(package, caller.user) {
            Ok(true) => {
                let status = icon.map(|icon| StatusIcon {
                    user: caller.user,
                    package: package.to_string(),
                    icon,
                    content_description,
                });
                self.delivery.post(SideEffect::SetStatusIcon {
                    slot: component.status_icon_slot().to_string(),
                    icon: status,
                });
            }
            Ok(false) => {
                tracing::debug!(package, "status icon ignored for non-system package");
            }
            Err(e) => {
                tracing::debug!(package, error = %e, "status icon skipped");
            }
        }
        Ok(())
    }

    /// Current state of the tile behind `token`, `None` if the token is unknown.
    pub async fn get_tile(&self, caller: Caller, token: Token) -> Result<Option<TileState>, SecurityError> {
        let Some(reg) = self.registry.lookup_by_token(token).await else {
            let available = self.registry.available_tiles().await;
            tracing::debug!(%token, %available, "tile for token not found");
            self.skipped(None, Skip::UnknownToken);
            return Ok(None);
        };
        self.authorize(&reg, caller)?;
        Ok(Some(reg.tile.qs_tile()))
    }

    /// Asks for an unlock, then runs the tile's click action.
    pub async fn start_unlock_and_run(&self, caller: Caller, token: Token) -> Result<(), SecurityError> {
        let Some(reg) = self.resolve(token, "start_unlock_and_run").await else {
            return Ok(());
        };
        self.authorize(&reg, caller)?;
        reg.tile.start_unlock_and_run();
        Ok(())
    }

    /// Whether the lock screen is showing.
    pub fn is_locked(&self) -> bool {
        self.keyguard.is_showing()
    }

    /// Whether the lock screen is showing behind a secure method.
    pub fn is_secure(&self) -> bool {
        self.keyguard.is_method_secure() && self.keyguard.is_showing()
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    async fn resolve(&self, token: Token, op: &'static str) -> Option<Registration> {
        let reg = self.registry.lookup_by_token(token).await;
        if reg.is_none() {
            tracing::debug!(op, %token, "event for unknown token dropped");
            self.skipped(None, Skip::UnknownToken);
        }
        reg
    }

    fn authorize(&self, reg: &Registration, caller: Caller) -> Result<Uid, SecurityError> {
        self.verifier.verify(reg.tile.component(), caller).inspect_err(|e| {
            let tile = reg.label();
            tracing::warn!(%tile, caller_uid = %caller.uid, reason = e.as_label(), "caller rejected");
            self.bus.publish(
                Event::new(EventKind::DispatchRejected)
                    .with_tile(tile)
                    .with_reason(e.as_label()),
            );
        })
    }

    /// Runs `f` under the registry lock if the tile is still registered.
    async fn with_manager(
        &self,
        reg: &Registration,
        op: &'static str,
        f: impl FnOnce(&dyn BindingManager),
    ) -> bool {
        let tables = self.registry.lock().await;
        if let Some(current) = tables.get(reg.id) {
            f(current.manager.as_ref());
            return true;
        }
        drop(tables);
        self.violation(reg, op, Skip::ManagerMissing);
        false
    }

    /// Like [`with_manager`](Self::with_manager), additionally requiring a started lifecycle.
    async fn with_started_manager(
        &self,
        reg: &Registration,
        op: &'static str,
        f: impl FnOnce(&dyn BindingManager),
    ) -> bool {
        let tables = self.registry.lock().await;
        let skip = match tables.get(reg.id) {
            Some(current) if current.manager.is_lifecycle_started() => {
                f(current.manager.as_ref());
                return true;
            }
            Some(_) => Skip::LifecycleNotStarted,
            None => Skip::ManagerMissing,
        };
        drop(tables);
        self.violation(reg, op, skip);
        false
    }

    fn violation(&self, reg: &Registration, op: &'static str, skip: Skip) {
        tracing::error!(
            op,
            tile = %reg.tile.tile_spec(),
            reason = skip.as_label(),
            "tile manager not ready"
        );
        self.skipped(Some(reg), skip);
    }

    fn skipped(&self, reg: Option<&Registration>, skip: Skip) {
        let mut ev = Event::new(EventKind::DispatchSkipped).with_reason(skip.as_label());
        if let Some(reg) = reg {
            ev = ev.with_tile(reg.label());
        }
        self.bus.publish(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;
    use crate::testing::{
        FakeKeyguard, FakeManager, FakePackages, FakeShell, FakeTile, ShellCall, TileCall,
    };
    use tokio_util::sync::CancellationToken;

    const OWNER: Caller = Caller {
        uid: Uid(10_001),
        user: UserId(0),
    };
    const IMPOSTOR: Caller = Caller {
        uid: Uid(10_666),
        user: UserId(0),
    };

    struct Fixture {
        registry: Arc<Registry>,
        dispatcher: Dispatcher,
        delivery: DeliveryQueue,
        shell: Arc<FakeShell>,
        keyguard: Arc<FakeKeyguard>,
        packages: Arc<FakePackages>,
        bus: Bus,
    }

    fn fixture() -> Fixture {
        let registry = Registry::new();
        let bus = Bus::new(64);
        let shell = Arc::new(FakeShell::default());
        let keyguard = Arc::new(FakeKeyguard::default());
        let packages = Arc::new(
            FakePackages::default()
                .with_package("com.example", UserId(0), Uid(10_001))
                .with_system_package("com.android.systemui", UserId(0), Uid(1_000)),
        );
        let (delivery, _worker) =
            DeliveryQueue::spawn(shell.clone(), 16, bus.clone(), CancellationToken::new());
        let dispatcher = Dispatcher::new(
            registry.clone(),
            packages.clone(),
            keyguard.clone(),
            delivery.clone(),
            bus.clone(),
        );
        Fixture {
            registry,
            dispatcher,
            delivery,
            shell,
            keyguard,
            packages,
            bus,
        }
    }

    async fn started_tile(f: &Fixture, package: &str, class: &str) -> (Arc<FakeTile>, Arc<FakeManager>) {
        let tile = FakeTile::new(0, package, class);
        let manager = FakeManager::new(1);
        f.registry.add(tile.clone(), manager.clone()).await.expect("add");
        manager.start_lifecycle_and_add_tile();
        (tile, manager)
    }

    #[tokio::test]
    async fn update_applies_state_and_refreshes() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let state = TileState::new("Wi-Fi", crate::tiles::ActiveState::Active);

        f.dispatcher
            .update_qs_tile(OWNER, state.clone(), manager.token())
            .await
            .expect("update");

        assert_eq!(
            tile.calls(),
            vec![TileCall::Update(state.clone(), Uid(10_001)), TileCall::Refresh]
        );
        assert_eq!(tile.qs_tile_state(), state);
        assert_eq!(manager.pending_bind_clears(), 1);
        assert!(manager.last_update().is_some());
    }

    #[tokio::test]
    async fn update_before_lifecycle_start_is_a_noop() {
        let f = fixture();
        let tile = FakeTile::new(0, "com.example", "com.example.Wifi");
        let manager = FakeManager::new(1);
        f.registry.add(tile.clone(), manager.clone()).await.expect("add");
        let mut rx = f.bus.subscribe();

        f.dispatcher
            .update_qs_tile(OWNER, TileState::default(), manager.token())
            .await
            .expect("no fault");
        f.dispatcher
            .on_start_successful(OWNER, manager.token())
            .await
            .expect("no fault");

        assert!(tile.calls().is_empty());
        assert_eq!(manager.pending_bind_clears(), 0);
        assert!(manager.last_update().is_none());

        let ev = rx.recv().await.expect("diagnostic");
        assert_eq!(ev.kind, EventKind::DispatchSkipped);
        assert_eq!(ev.reason.as_deref(), Some("lifecycle_not_started"));
    }

    #[tokio::test]
    async fn unknown_token_mutates_nothing() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let stranger = Token::from_raw(7);

        f.dispatcher
            .update_qs_tile(OWNER, TileState::default(), stranger)
            .await
            .expect("no fault");
        f.dispatcher.on_start_successful(OWNER, stranger).await.expect("no fault");
        f.dispatcher.on_show_dialog(OWNER, stranger).await.expect("no fault");
        f.dispatcher.on_dialog_hidden(OWNER, stranger).await.expect("no fault");
        f.dispatcher.on_start_activity(OWNER, stranger).await.expect("no fault");
        f.dispatcher
            .start_activity(OWNER, stranger, PendingIntent::new("com.example", "open"))
            .await
            .expect("no fault");
        f.dispatcher
            .update_status_icon(OWNER, stranger, Some(Icon::new("res://x")), None)
            .await
            .expect("no fault");
        f.dispatcher.start_unlock_and_run(OWNER, stranger).await.expect("no fault");
        assert_eq!(f.dispatcher.get_tile(OWNER, stranger).await, Ok(None));

        f.delivery.flush().await;
        assert!(tile.calls().is_empty());
        assert!(f.shell.calls().is_empty());
        assert!(!manager.is_showing_dialog());
        assert_eq!(manager.pending_bind_clears(), 0);
    }

    #[tokio::test]
    async fn impostor_is_rejected_without_side_effects() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let mut rx = f.bus.subscribe();

        let err = f
            .dispatcher
            .update_qs_tile(IMPOSTOR, TileState::default(), manager.token())
            .await
            .expect_err("rejected");
        assert_eq!(err.as_label(), "security_owner_mismatch");

        assert!(f.dispatcher.on_show_dialog(IMPOSTOR, manager.token()).await.is_err());
        assert!(f.dispatcher.get_tile(IMPOSTOR, manager.token()).await.is_err());
        assert!(
            f.dispatcher
                .start_activity(IMPOSTOR, manager.token(), PendingIntent::new("x", "y"))
                .await
                .is_err()
        );
        assert!(f.dispatcher.start_unlock_and_run(IMPOSTOR, manager.token()).await.is_err());

        f.delivery.flush().await;
        assert!(tile.calls().is_empty());
        assert!(f.shell.calls().is_empty());
        assert!(!manager.is_showing_dialog());
        assert!(manager.last_update().is_none());

        let ev = rx.recv().await.expect("rejection");
        assert_eq!(ev.kind, EventKind::DispatchRejected);
        assert_eq!(ev.tile.as_deref(), Some("com.example/.Wifi"));
    }

    #[tokio::test]
    async fn dialog_toggles_flag_and_collapses_once() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;

        f.dispatcher.on_show_dialog(OWNER, manager.token()).await.expect("show");
        f.delivery.flush().await;
        assert!(manager.is_showing_dialog());
        assert_eq!(f.shell.calls(), vec![ShellCall::Collapse]);

        f.dispatcher.on_dialog_hidden(OWNER, manager.token()).await.expect("hide");
        f.delivery.flush().await;
        assert!(!manager.is_showing_dialog());
        assert_eq!(f.shell.calls(), vec![ShellCall::Collapse]);
        assert_eq!(tile.calls(), vec![TileCall::DialogShown, TileCall::DialogHidden]);
    }

    #[tokio::test]
    async fn activity_requests_are_forwarded() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let intent = PendingIntent::new("com.example", "settings");

        f.dispatcher.on_start_activity(OWNER, manager.token()).await.expect("collapse");
        f.dispatcher
            .start_activity(OWNER, manager.token(), intent.clone())
            .await
            .expect("start");
        f.dispatcher.start_unlock_and_run(OWNER, manager.token()).await.expect("unlock");
        f.delivery.flush().await;

        assert_eq!(f.shell.calls(), vec![ShellCall::Collapse]);
        assert_eq!(
            tile.calls(),
            vec![TileCall::StartActivity(intent), TileCall::UnlockAndRun]
        );
    }

    #[tokio::test]
    async fn status_icon_only_for_system_packages() {
        let f = fixture();
        let (_, app) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let (_, system) = started_tile(&f, "com.android.systemui", "com.android.systemui.Rec").await;
        let system_caller = Caller::new(Uid(1_000), UserId(0));

        f.dispatcher
            .update_status_icon(OWNER, app.token(), Some(Icon::new("res://app")), None)
            .await
            .expect("ignored");
        f.dispatcher
            .update_status_icon(
                system_caller,
                system.token(),
                Some(Icon::new("res://rec")),
                Some("Recording".into()),
            )
            .await
            .expect("set");
        f.dispatcher
            .update_status_icon(system_caller, system.token(), None, None)
            .await
            .expect("clear");
        f.delivery.flush().await;

        let expected = StatusIcon {
            user: UserId(0),
            package: "com.android.systemui".into(),
            icon: Icon::new("res://rec"),
            content_description: Some("Recording".into()),
        };
        assert_eq!(
            f.shell.calls(),
            vec![
                ShellCall::SetIcon("com.android.systemui.Rec".into(), Some(expected)),
                ShellCall::SetIcon("com.android.systemui.Rec".into(), None),
            ]
        );
    }

    #[tokio::test]
    async fn status_icon_swallows_package_lookup_failure() {
        let f = fixture();
        let (_, system) = started_tile(&f, "com.android.systemui", "com.android.systemui.Rec").await;
        let system_caller = Caller::new(Uid(1_000), UserId(0));
        f.packages.fail_system_lookups(true);

        f.dispatcher
            .update_status_icon(system_caller, system.token(), Some(Icon::new("res://rec")), None)
            .await
            .expect("swallowed");
        f.delivery.flush().await;
        assert!(f.shell.calls().is_empty());
    }

    #[tokio::test]
    async fn get_tile_returns_current_state() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let state = TileState::new("Wi-Fi", crate::tiles::ActiveState::Inactive);
        tile.set_qs_tile_state(state.clone());

        assert_eq!(f.dispatcher.get_tile(OWNER, manager.token()).await, Ok(Some(state)));
    }

    #[tokio::test]
    async fn freed_tile_token_is_unknown() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let reg = f.registry.lookup_by_token(manager.token()).await.expect("reg");
        f.registry.remove(reg.id).await.expect("removed");

        f.dispatcher
            .update_qs_tile(OWNER, TileState::default(), manager.token())
            .await
            .expect("no fault");
        assert_eq!(f.dispatcher.get_tile(OWNER, manager.token()).await, Ok(None));
        assert!(tile.calls().is_empty());
    }

    #[tokio::test]
    async fn tile_freed_after_resolution_is_skipped() {
        let f = fixture();
        let (tile, manager) = started_tile(&f, "com.example", "com.example.Wifi").await;
        let stale = f.registry.lookup_by_token(manager.token()).await.expect("reg");
        f.registry.remove(stale.id).await.expect("removed");
        let mut rx = f.bus.subscribe();

        let ran = f
            .dispatcher
            .with_manager(&stale, "on_show_dialog", |m| m.set_showing_dialog(true))
            .await;
        assert!(!ran);
        let ran = f
            .dispatcher
            .with_started_manager(&stale, "update_qs_tile", |m| m.clear_pending_bind())
            .await;
        assert!(!ran);

        assert!(!manager.is_showing_dialog());
        assert_eq!(manager.pending_bind_clears(), 0);
        assert!(tile.calls().is_empty());
        for _ in 0..2 {
            let ev = rx.recv().await.expect("diagnostic");
            assert_eq!(ev.kind, EventKind::DispatchSkipped);
            assert_eq!(ev.reason.as_deref(), Some("manager_missing"));
            assert_eq!(ev.tile.as_deref(), Some("com.example/.Wifi"));
        }
    }

    #[tokio::test]
    async fn lock_state_queries() {
        let f = fixture();
        assert!(!f.dispatcher.is_locked());
        assert!(!f.dispatcher.is_secure());

        f.keyguard.set_method_secure(true);
        assert!(!f.dispatcher.is_secure());

        f.keyguard.set_showing(true);
        assert!(f.dispatcher.is_locked());
        assert!(f.dispatcher.is_secure());
    }
}
