use crate::tiles::StatusIcon;

/// Shell side effect produced by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Collapse any expanded panel.
    CollapsePanels,

    /// Set the status icon in `slot`; `None` clears it.
    SetStatusIcon {
        slot: String,
        icon: Option<StatusIcon>,
    },

    /// Remove the status icon slot of a freed tile.
    RemoveStatusIcon { slot: String },
}

impl SideEffect {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SideEffect::CollapsePanels => "collapse_panels",
            SideEffect::SetStatusIcon { .. } => "set_status_icon",
            SideEffect::RemoveStatusIcon { .. } => "remove_status_icon",
        }
    }
}
