//! Test doubles for tiles, managers and platform collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::error::PackageError;
use crate::identity::{ComponentName, Token, Uid, UserId};
use crate::platform::{KeyguardState, PackageResolver, Shell};
use crate::tiles::{
    BindingManager, ManagerFactory, ManagerRef, PendingIntent, StatusIcon, Tile, TileRef,
    TileState,
};

// ---------------------------
// Tiles
// ---------------------------

/// Callback observed by a [`FakeTile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileCall {
    Update(TileState, Uid),
    Refresh,
    DialogShown,
    DialogHidden,
    StartActivity(PendingIntent),
    UnlockAndRun,
}

pub struct FakeTile {
    component: ComponentName,
    user: UserId,
    state: Mutex<TileState>,
    calls: Mutex<Vec<TileCall>>,
}

impl FakeTile {
    pub fn new(user: u32, package: &str, class: &str) -> Arc<Self> {
        Arc::new(Self {
            component: ComponentName::new(package, class),
            user: UserId(user),
            state: Mutex::new(TileState::default()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<TileCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn qs_tile_state(&self) -> TileState {
        self.state.lock().unwrap().clone()
    }

    pub fn set_qs_tile_state(&self, state: TileState) {
        *self.state.lock().unwrap() = state;
    }

    fn record(&self, call: TileCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Tile for FakeTile {
    fn component(&self) -> &ComponentName {
        &self.component
    }

    fn user(&self) -> UserId {
        self.user
    }

    fn qs_tile(&self) -> TileState {
        self.qs_tile_state()
    }

    fn update_tile_state(&self, state: TileState, uid: Uid) {
        self.set_qs_tile_state(state.clone());
        self.record(TileCall::Update(state, uid));
    }

    fn refresh_state(&self) {
        self.record(TileCall::Refresh);
    }

    fn on_dialog_shown(&self) {
        self.record(TileCall::DialogShown);
    }

    fn on_dialog_hidden(&self) {
        self.record(TileCall::DialogHidden);
    }

    fn start_activity_and_collapse(&self, intent: PendingIntent) {
        self.record(TileCall::StartActivity(intent));
    }

    fn start_unlock_and_run(&self) {
        self.record(TileCall::UnlockAndRun);
    }
}

// ---------------------------
// Managers
// ---------------------------

/// Counts managers currently allowed to bind, and the highest count seen.
#[derive(Clone, Default)]
pub struct AllowedGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl AllowedGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn grant(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn revoke(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeManager {
    token: Token,
    score: AtomicI64,
    priority: AtomicI64,
    priority_calculations: AtomicUsize,
    gauge: Option<AllowedGauge>,
    bind_allowed: AtomicBool,
    bind_requested: AtomicBool,
    lifecycle_started: AtomicBool,
    destroyed: AtomicBool,
    showing_dialog: AtomicBool,
    active_tile: AtomicBool,
    pending_bind_clears: AtomicUsize,
    listening_requests: AtomicUsize,
    last_update: Mutex<Option<SystemTime>>,
}

impl FakeManager {
    pub fn new(score: i64) -> Arc<Self> {
        Arc::new(Self::build(score, Token::generate(), None))
    }

    pub fn with_token(score: i64, token: Token) -> Arc<Self> {
        Arc::new(Self::build(score, token, None))
    }

    /// Manager reporting allowance changes to `gauge`.
    pub fn gauged(score: i64, gauge: &AllowedGauge) -> Arc<Self> {
        Arc::new(Self::build(score, Token::generate(), Some(gauge.clone())))
    }

    fn build(score: i64, token: Token, gauge: Option<AllowedGauge>) -> Self {
        Self {
            token,
            score: AtomicI64::new(score),
            priority: AtomicI64::new(0),
            priority_calculations: AtomicUsize::new(0),
            gauge,
            bind_allowed: AtomicBool::new(false),
            bind_requested: AtomicBool::new(false),
            lifecycle_started: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            showing_dialog: AtomicBool::new(false),
            active_tile: AtomicBool::new(false),
            pending_bind_clears: AtomicUsize::new(0),
            listening_requests: AtomicUsize::new(0),
            last_update: Mutex::new(None),
        }
    }

    /// Score used by the next priority calculation.
    pub fn set_score(&self, score: i64) {
        self.score.store(score, Ordering::SeqCst);
    }

    pub fn priority_calculations(&self) -> usize {
        self.priority_calculations.load(Ordering::SeqCst)
    }

    pub fn set_active_tile(&self, active: bool) {
        self.active_tile.store(active, Ordering::SeqCst);
    }

    pub fn is_bind_requested(&self) -> bool {
        self.bind_requested.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn is_showing_dialog(&self) -> bool {
        self.showing_dialog.load(Ordering::SeqCst)
    }

    pub fn pending_bind_clears(&self) -> usize {
        self.pending_bind_clears.load(Ordering::SeqCst)
    }

    pub fn listening_requests(&self) -> usize {
        self.listening_requests.load(Ordering::SeqCst)
    }

    pub fn last_update(&self) -> Option<SystemTime> {
        *self.last_update.lock().unwrap()
    }
}

impl BindingManager for FakeManager {
    fn token(&self) -> Token {
        self.token
    }

    fn start_lifecycle_and_add_tile(&self) {
        self.lifecycle_started.store(true, Ordering::SeqCst);
    }

    fn set_bind_allowed(&self, allowed: bool) {
        let was = self.bind_allowed.swap(allowed, Ordering::SeqCst);
        if let Some(gauge) = &self.gauge {
            match (was, allowed) {
                (false, true) => gauge.grant(),
                (true, false) => gauge.revoke(),
                _ => {}
            }
        }
    }

    fn is_bind_allowed(&self) -> bool {
        self.bind_allowed.load(Ordering::SeqCst)
    }

    fn set_bind_requested(&self, requested: bool) {
        self.bind_requested.store(requested, Ordering::SeqCst);
    }

    fn calculate_bind_priority(&self, _now: SystemTime) {
        self.priority_calculations.fetch_add(1, Ordering::SeqCst);
        self.priority
            .store(self.score.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    fn bind_priority(&self) -> i64 {
        self.priority.load(Ordering::SeqCst)
    }

    fn handle_destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn is_lifecycle_started(&self) -> bool {
        self.lifecycle_started.load(Ordering::SeqCst)
    }

    fn clear_pending_bind(&self) {
        self.pending_bind_clears.fetch_add(1, Ordering::SeqCst);
    }

    fn set_last_update(&self, at: SystemTime) {
        *self.last_update.lock().unwrap() = Some(at);
    }

    fn set_showing_dialog(&self, showing: bool) {
        self.showing_dialog.store(showing, Ordering::SeqCst);
    }

    fn is_active_tile(&self) -> bool {
        self.active_tile.load(Ordering::SeqCst)
    }

    fn request_listening_start(&self) {
        self.listening_requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out [`FakeManager`]s scored by component class.
#[derive(Default)]
pub struct FakeFactory {
    scores: HashMap<String, i64>,
    created: Mutex<Vec<Arc<FakeManager>>>,
}

impl FakeFactory {
    pub fn with_score(mut self, class: &str, score: i64) -> Self {
        self.scores.insert(class.to_string(), score);
        self
    }

    /// Managers created so far, in creation order.
    pub fn created(&self) -> Vec<Arc<FakeManager>> {
        self.created.lock().unwrap().clone()
    }
}

impl ManagerFactory for FakeFactory {
    fn create(&self, tile: &TileRef) -> ManagerRef {
        let score = self
            .scores
            .get(tile.component().class())
            .copied()
            .unwrap_or(0);
        let manager = FakeManager::new(score);
        self.created.lock().unwrap().push(manager.clone());
        manager
    }
}

// ---------------------------
// Platform
// ---------------------------

#[derive(Default)]
pub struct FakePackages {
    uids: HashMap<(String, UserId), Uid>,
    system: HashSet<(String, UserId)>,
    fail_system_lookups: AtomicBool,
}

impl FakePackages {
    pub fn with_package(mut self, package: &str, user: UserId, uid: Uid) -> Self {
        self.uids.insert((package.to_string(), user), uid);
        self
    }

    pub fn with_system_package(mut self, package: &str, user: UserId, uid: Uid) -> Self {
        self.system.insert((package.to_string(), user));
        self.with_package(package, user, uid)
    }

    /// Makes `is_system_package` fail as if the package vanished.
    pub fn fail_system_lookups(&self, fail: bool) {
        self.fail_system_lookups.store(fail, Ordering::SeqCst);
    }

    fn not_found(package: &str, user: UserId) -> PackageError {
        PackageError::NameNotFound {
            package: package.to_string(),
            user,
        }
    }
}

impl PackageResolver for FakePackages {
    fn package_uid(&self, package: &str, user: UserId) -> Result<Uid, PackageError> {
        self.uids
            .get(&(package.to_string(), user))
            .copied()
            .ok_or_else(|| Self::not_found(package, user))
    }

    fn is_system_package(&self, package: &str, user: UserId) -> Result<bool, PackageError> {
        let key = (package.to_string(), user);
        if self.fail_system_lookups.load(Ordering::SeqCst) || !self.uids.contains_key(&key) {
            return Err(Self::not_found(package, user));
        }
        Ok(self.system.contains(&key))
    }
}

#[derive(Default)]
pub struct FakeKeyguard {
    showing: AtomicBool,
    method_secure: AtomicBool,
}

impl FakeKeyguard {
    pub fn set_showing(&self, showing: bool) {
        self.showing.store(showing, Ordering::SeqCst);
    }

    pub fn set_method_secure(&self, secure: bool) {
        self.method_secure.store(secure, Ordering::SeqCst);
    }
}

impl KeyguardState for FakeKeyguard {
    fn is_showing(&self) -> bool {
        self.showing.load(Ordering::SeqCst)
    }

    fn is_method_secure(&self) -> bool {
        self.method_secure.load(Ordering::SeqCst)
    }
}

/// Call observed by a [`FakeShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    Collapse,
    SetIcon(String, Option<StatusIcon>),
    RemoveIcon(String),
}

#[derive(Default)]
pub struct FakeShell {
    calls: Mutex<Vec<ShellCall>>,
    panic_on_collapse: AtomicBool,
}

impl FakeShell {
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes `collapse_panels` panic (before recording anything).
    pub fn panic_on_collapse(&self, panic: bool) {
        self.panic_on_collapse.store(panic, Ordering::SeqCst);
    }
}

impl Shell for FakeShell {
    fn collapse_panels(&self) {
        if self.panic_on_collapse.load(Ordering::SeqCst) {
            panic!("collapse failed");
        }
        self.calls.lock().unwrap().push(ShellCall::Collapse);
    }

    fn set_icon_from_tile(&self, slot: &str, icon: Option<StatusIcon>) {
        self.calls
            .lock()
            .unwrap()
            .push(ShellCall::SetIcon(slot.to_string(), icon));
    }

    fn remove_icon_for_tile(&self, slot: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(ShellCall::RemoveIcon(slot.to_string()));
    }
}
