//! # Caller verification for the remote event surface.
//!
//! A remote call is honoured only if the calling uid is the uid that owns the
//! tile component's package for the calling user.
//!
//! ```text
//! (component.package, caller.user) ──PackageResolver──► expected uid
//!                                                           │
//!                       caller.uid == expected ? Ok(uid) : Err(OwnerMismatch)
//! unresolvable package ─────────────────────────────────► Err(UnknownPackage)
//! ```

use std::sync::Arc;

use crate::error::{PackageError, SecurityError};
use crate::identity::{Caller, ComponentName, Uid};
use crate::platform::PackageResolver;

/// Authenticates callers against a tile's declared owner.
#[derive(Clone)]
pub struct CallerVerifier {
    packages: Arc<dyn PackageResolver>,
}

impl CallerVerifier {
    pub fn new(packages: Arc<dyn PackageResolver>) -> Self {
        Self { packages }
    }

    /// Returns the owning uid if `caller` owns `component`.
    pub fn verify(&self, component: &ComponentName, caller: Caller) -> Result<Uid, SecurityError> {
        let expected = self
            .packages
            .package_uid(component.package(), caller.user)
            .map_err(|e| match e {
                PackageError::NameNotFound { package, user } => {
                    SecurityError::UnknownPackage { package, user }
                }
            })?;
        if caller.uid != expected {
            return Err(SecurityError::OwnerMismatch {
                expected,
                actual: caller.uid,
            });
        }
        Ok(expected)
    }
}
