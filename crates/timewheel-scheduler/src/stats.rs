//! Point-in-time view of a wheel.

use serde::Serialize;

/// Snapshot taken by the scheduler loop between ticks, or read straight from
/// the store while the wheel is still idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WheelStats {
    /// Tick interval in microseconds.
    pub interval_us: u64,
    pub slot_count: usize,
    /// Slot the next tick will process.
    pub cursor: usize,
    /// Tasks currently scheduled.
    pub pending: usize,
    pub ticks: u64,
    /// Callbacks handed to the dispatcher.
    pub fired: u64,
    /// Removals that hit a pending task.
    pub cancelled: u64,
    pub callback_panics: u64,
    /// Longest slot queue any tick has scanned.
    pub max_slot_depth: usize,
}
