//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the tile runtime.
//!
//! Config is consumed once by [`TileServices::builder`](crate::TileServices::builder)
//! and validated there.
//!
//! ## Sentinel values
//! - `bus_capacity`, `command_queue_capacity`, `delivery_queue_capacity` are clamped to a minimum of 1.

use crate::error::ConfigError;

/// Bound limit when the device is not under memory pressure.
pub const DEFAULT_MAX_BOUND: usize = 3;

/// Bound limit while memory pressure is signalled.
pub const REDUCED_MAX_BOUND: usize = 1;

/// Global configuration for the tile runtime.
///
/// ## Field semantics
/// - `normal_capacity`: how many managers may bind without memory pressure
/// - `reduced_capacity`: how many managers may bind under memory pressure
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `command_queue_capacity`: bound of the external command channel (min 1)
/// - `delivery_queue_capacity`: bound of the side-effect delivery queue (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of bind-allowed managers in normal mode.
    pub normal_capacity: usize,

    /// Maximum number of bind-allowed managers under memory pressure.
    ///
    /// Must be `>= 1` and strictly less than `normal_capacity`.
    pub reduced_capacity: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Capacity of the command channel.
    ///
    /// When full, `CommandHandle::submit` waits and `try_submit` returns `Full`.
    pub command_queue_capacity: usize,

    /// Capacity of the delivery queue for shell side effects.
    ///
    /// Effects posted while the queue is full are dropped and reported.
    pub delivery_queue_capacity: usize,
}

impl Config {
    /// Checks capacity ordering: `normal > reduced >= 1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reduced_capacity == 0 {
            return Err(ConfigError::ZeroReducedCapacity);
        }
        if self.normal_capacity <= self.reduced_capacity {
            return Err(ConfigError::CapacityOrder {
                normal: self.normal_capacity,
                reduced: self.reduced_capacity,
            });
        }
        Ok(())
    }

    /// Returns the capacity for the given pressure mode.
    #[inline]
    pub fn capacity(&self, pressured: bool) -> usize {
        if pressured {
            self.reduced_capacity
        } else {
            self.normal_capacity
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn command_queue_capacity_clamped(&self) -> usize {
        self.command_queue_capacity.max(1)
    }

    #[inline]
    pub fn delivery_queue_capacity_clamped(&self) -> usize {
        self.delivery_queue_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `normal_capacity = 3`
    /// - `reduced_capacity = 1`
    /// - `bus_capacity = 1024`
    /// - `command_queue_capacity = 256`
    /// - `delivery_queue_capacity = 1024`
    fn default() -> Self {
        Self {
            normal_capacity: DEFAULT_MAX_BOUND,
            reduced_capacity: REDUCED_MAX_BOUND,
            bus_capacity: 1024,
            command_queue_capacity: 256,
            delivery_queue_capacity: 1024,
        }
    }
}
