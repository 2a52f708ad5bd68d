//! # Platform collaborators.
//!
//! Narrow traits for the services the runtime consults but does not own:
//! package metadata, lock-screen state, the foreground user and the shell
//! (panel + status bar). All are injected through
//! [`TileServicesBuilder`](crate::TileServicesBuilder).

use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use crate::error::PackageError;
use crate::identity::{Uid, UserId};
use crate::tiles::StatusIcon;

/// Package metadata lookups.
pub trait PackageResolver: Send + Sync + 'static {
    /// Uid owning `package` for `user`.
    fn package_uid(&self, package: &str, user: UserId) -> Result<Uid, PackageError>;

    /// Whether `package` is a privileged (system) package for `user`.
    fn is_system_package(&self, package: &str, user: UserId) -> Result<bool, PackageError>;
}

/// Lock-screen state.
pub trait KeyguardState: Send + Sync + 'static {
    fn is_showing(&self) -> bool;

    /// Whether the configured unlock method is secure (pin/pattern/etc).
    fn is_method_secure(&self) -> bool;
}

/// Keyguard that is never showing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeyguard;

impl KeyguardState for NoKeyguard {
    fn is_showing(&self) -> bool {
        false
    }

    fn is_method_secure(&self) -> bool {
        false
    }
}

/// Foreground user source.
pub trait UserTracker: Send + Sync + 'static {
    fn current_user(&self) -> UserId;
}

/// [`UserTracker`] backed by an atomic, updated on user switch.
#[derive(Debug)]
pub struct CurrentUser(AtomicU32);

impl CurrentUser {
    pub fn new(user: UserId) -> Self {
        Self(AtomicU32::new(user.0))
    }

    pub fn switch_to(&self, user: UserId) {
        self.0.store(user.0, AtomicOrdering::Release);
    }
}

impl UserTracker for CurrentUser {
    fn current_user(&self) -> UserId {
        UserId(self.0.load(AtomicOrdering::Acquire))
    }
}

/// Shell surfaces driven by side effects.
///
/// Only ever called from the delivery worker, never under the registry lock.
pub trait Shell: Send + Sync + 'static {
    /// Collapses any expanded panel.
    fn collapse_panels(&self);

    /// Sets (or clears, with `None`) the status icon in `slot`.
    fn set_icon_from_tile(&self, slot: &str, icon: Option<StatusIcon>);

    fn remove_icon_for_tile(&self, slot: &str);
}

/// Shell that ignores every effect. Used when no shell is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullShell;

impl Shell for NullShell {
    fn collapse_panels(&self) {}

    fn set_icon_from_tile(&self, _slot: &str, _icon: Option<StatusIcon>) {}

    fn remove_icon_for_tile(&self, _slot: &str) {}
}
