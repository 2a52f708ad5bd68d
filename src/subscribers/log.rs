//! # LogWriter - renders runtime events through `tracing`
//!
//! Severity follows the event's meaning: rejections and delivery failures are
//! warnings, skips and membership changes are debug/info.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  tilevisor::events: tile added tile="com.example/.Wifi"
//! INFO  tilevisor::events: allowance recalculated capacity=3 allowed=3 total=4
//! WARN  tilevisor::events: dispatch rejected tile="com.example/.Wifi" reason="security_owner_mismatch"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "tilevisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tile = e.tile.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TileAdded => {
                tracing::info!(target: TARGET, seq = e.seq, tile, "tile added");
            }
            EventKind::TileRemoved => {
                tracing::info!(target: TARGET, seq = e.seq, tile, "tile removed");
            }
            EventKind::TileAddRejected => {
                tracing::warn!(target: TARGET, seq = e.seq, tile, reason, "tile add rejected");
            }
            EventKind::CapacityChanged => {
                tracing::info!(target: TARGET, seq = e.seq, capacity = ?e.capacity, reason, "capacity changed");
            }
            EventKind::AllowanceRecalculated => {
                tracing::info!(
                    target: TARGET,
                    seq = e.seq,
                    capacity = ?e.capacity,
                    allowed = ?e.allowed,
                    total = ?e.total,
                    "allowance recalculated"
                );
            }
            EventKind::DispatchRejected => {
                tracing::warn!(target: TARGET, seq = e.seq, tile, reason, "dispatch rejected");
            }
            EventKind::DispatchSkipped => {
                tracing::debug!(target: TARGET, seq = e.seq, tile, reason, "dispatch skipped");
            }
            EventKind::ListeningRequested => {
                tracing::debug!(target: TARGET, seq = e.seq, tile, "listening requested");
            }
            EventKind::DeliveryOverflow => {
                tracing::warn!(target: TARGET, seq = e.seq, reason, "delivery overflow");
            }
            EventKind::DeliveryPanicked => {
                tracing::error!(target: TARGET, seq = e.seq, reason, "delivery panicked");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: TARGET, seq = e.seq, subscriber = tile, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: TARGET, seq = e.seq, subscriber = tile, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
