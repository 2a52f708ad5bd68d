//! # Identities used by the registry and the dispatch path.
//!
//! - [`ComponentName`]: package + class of the remote component backing a tile.
//! - [`TileIdentity`]: `(user, component)` pair, unique per logical tile.
//! - [`TileId`]: registry-assigned handle of a registered tile object.
//! - [`Token`]: opaque capability value owned by a binding manager.
//! - [`Caller`]: identity of the process invoking the remote event surface.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Global counter for tile handles.
static TILE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Platform user id (the "user" half of a [`TileIdentity`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process uid as reported by the transport for an inbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid(pub u32);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a remote component: owning package plus class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentName {
    package: String,
    class: String,
}

impl ComponentName {
    /// Creates a component reference.
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }

    /// Returns the declaring package.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the fully qualified class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Returns `package/class`, abbreviating the class to `.Suffix` when it lives
    /// inside the package namespace.
    pub fn flatten_to_short_string(&self) -> String {
        match self.class.strip_prefix(self.package.as_str()) {
            Some(rest) if rest.starts_with('.') => format!("{}/{}", self.package, rest),
            _ => format!("{}/{}", self.package, self.class),
        }
    }

    /// Slot name used for status icons published on behalf of this component.
    pub fn status_icon_slot(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten_to_short_string())
    }
}

/// `(user, component)` pair uniquely identifying a logical tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileIdentity {
    pub user: UserId,
    pub component: ComponentName,
}

impl TileIdentity {
    pub fn new(user: UserId, component: ComponentName) -> Self {
        Self { user, component }
    }
}

impl fmt::Display for TileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.component, self.user)
    }
}

/// Handle of a registered tile object.
///
/// Handles increase monotonically, so their order is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(u64);

impl TileId {
    pub(crate) fn next() -> Self {
        Self(TILE_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// Opaque capability value identifying a manager's connection session.
///
/// Generated from 128 random bits; the registry refuses to register a token
/// that is already live.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u128);

impl Token {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(rand::random::<u128>())
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u128) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a short prefix, tokens are capabilities.
        write!(f, "Token({:08x}…)", (self.0 >> 96) as u32)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identity of the process behind an inbound remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Calling uid.
    pub uid: Uid,
    /// User the call was made as.
    pub user: UserId,
}

impl Caller {
    pub fn new(uid: Uid, user: UserId) -> Self {
        Self { uid, user }
    }
}
