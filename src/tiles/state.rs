//! # Payloads exchanged with remote tile connections.

use std::sync::Arc;

use crate::identity::UserId;

/// Availability of a tile as reported by its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveState {
    /// Tile cannot be used right now.
    Unavailable,
    /// Tile is usable and off.
    #[default]
    Inactive,
    /// Tile is usable and on.
    Active,
}

/// Opaque icon reference (resource uri or encoded image handle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon(Arc<str>);

impl Icon {
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self(uri.into())
    }

    pub fn uri(&self) -> &str {
        &self.0
    }
}

/// Tile state pushed by the remote connection with `update_qs_tile`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileState {
    pub label: Option<String>,
    pub subtitle: Option<String>,
    pub content_description: Option<String>,
    pub state: ActiveState,
    pub icon: Option<Icon>,
}

impl TileState {
    /// Creates a labelled state with the given availability.
    pub fn new(label: impl Into<String>, state: ActiveState) -> Self {
        Self {
            label: Some(label.into()),
            state,
            ..Self::default()
        }
    }
}

/// Descriptor of an activity the remote connection asks to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIntent {
    /// Package that created the intent.
    pub creator_package: String,
    /// Action or target of the intent.
    pub action: String,
}

impl PendingIntent {
    pub fn new(creator_package: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            creator_package: creator_package.into(),
            action: action.into(),
        }
    }
}

/// Status indicator shown on behalf of a privileged tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIcon {
    pub user: UserId,
    pub package: String,
    pub icon: Icon,
    pub content_description: Option<String>,
}
