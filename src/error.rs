//! Error types used by the tilevisor runtime.
//!
//! This module defines the error enums surfaced to callers:
//!
//! - [`SecurityError`] - a remote caller failed authentication against a tile's owner.
//! - [`RegistryError`] - a tile could not be registered.
//! - [`ConfigError`] - runtime configuration is inconsistent.
//! - [`BuildError`] - the runtime could not be assembled.
//! - [`SubmitError`] - a command could not be queued.
//! - [`PackageError`] - package metadata lookup failed (platform collaborator).
//!
//! Errors that callers can act on provide `as_label` (stable snake_case, for
//! logs/metrics) and `as_message` helpers.
//!
//! Recoverable conditions on the dispatch path (unknown token, missing manager,
//! lifecycle not started) are **not** errors: they are logged and swallowed,
//! see [`crate::core`].

use thiserror::Error;

use crate::identity::{ComponentName, TileIdentity, Uid, UserId};

/// # Authentication failures on the remote event surface.
///
/// Always returned to the caller; the triggering operation is aborted and no
/// state is mutated.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// The calling uid differs from the uid owning the tile's package.
    #[error("component outside caller's uid: expected={expected}, actual={actual}")]
    OwnerMismatch {
        /// Uid owning the tile's package for the calling user.
        expected: Uid,
        /// Uid of the invoking process.
        actual: Uid,
    },

    /// The tile's package could not be resolved for the calling user.
    #[error("package {package:?} not found for user {user}")]
    UnknownPackage {
        /// Declared package of the tile's component.
        package: String,
        /// User the call was made as.
        user: UserId,
    },
}

impl SecurityError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tilevisor::{SecurityError, Uid};
    ///
    /// let err = SecurityError::OwnerMismatch { expected: Uid(10), actual: Uid(11) };
    /// assert_eq!(err.as_label(), "security_owner_mismatch");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SecurityError::OwnerMismatch { .. } => "security_owner_mismatch",
            SecurityError::UnknownPackage { .. } => "security_unknown_package",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SecurityError::OwnerMismatch { expected, actual } => {
                format!("caller uid {actual} does not own tile (owner uid {expected})")
            }
            SecurityError::UnknownPackage { package, user } => {
                format!("cannot resolve owner of {package} for user {user}")
            }
        }
    }
}

/// # Errors produced when registering a tile.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A tile with the same `(user, component)` is already registered.
    #[error("tile {identity} already registered")]
    AlreadyRegistered {
        /// Identity of the conflicting tile.
        identity: TileIdentity,
    },

    /// The manager's token is already held by another registered tile.
    #[error("token already in use by {holder}")]
    TokenCollision {
        /// Component currently holding the token.
        holder: ComponentName,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::AlreadyRegistered { .. } => "tile_already_registered",
            RegistryError::TokenCollision { .. } => "token_collision",
        }
    }
}

/// # Configuration validation failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Reduced capacity must be at least one.
    #[error("reduced capacity must be >= 1")]
    ZeroReducedCapacity,

    /// Normal capacity must be strictly greater than reduced capacity.
    #[error("normal capacity {normal} must exceed reduced capacity {reduced}")]
    CapacityOrder {
        /// Configured normal capacity.
        normal: usize,
        /// Configured reduced capacity.
        reduced: usize,
    },
}

/// # Errors produced while assembling [`TileServices`](crate::TileServices).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Configuration rejected by [`Config::validate`](crate::Config::validate).
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A required collaborator was not provided to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

impl BuildError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::InvalidConfig(_) => "build_invalid_config",
            BuildError::MissingCollaborator(_) => "build_missing_collaborator",
        }
    }
}

/// Error returned by [`CommandHandle`](crate::CommandHandle) submissions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Command queue is full (try again later or use async `submit`).
    #[error("command queue full")]
    Full,

    /// Command loop is gone (runtime destroyed).
    #[error("command channel closed")]
    Closed,
}

/// Error reported by a [`PackageResolver`](crate::PackageResolver).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageError {
    /// The package is not installed for the given user.
    #[error("package {package:?} not installed for user {user}")]
    NameNotFound {
        /// Requested package.
        package: String,
        /// Requested user.
        user: UserId,
    },
}
