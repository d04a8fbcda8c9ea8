//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the watch/rebuild/run loop.
//!
//! ## Sentinel values
//! - `debounce = 0s` → every filesystem event becomes a trigger (no coalescing)
//! - `stop_grace = 0s` → escalate to a forced kill immediately

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `debounce`: window within which a burst of filesystem events collapses
///   into a single rebuild trigger
/// - `stop_grace`: how long to wait after the graceful termination signal
///   before force-killing a child that has not exited
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Coalescing window for filesystem change events.
    ///
    /// Editors commonly emit several write events per save; any events within
    /// this window after an admitted one are dropped rather than queued.
    pub debounce: Duration,

    /// Maximum wait between the graceful stop signal and the forced kill.
    ///
    /// When a trigger replaces a running child:
    /// - the child gets SIGTERM (or the platform equivalent)
    /// - the supervisor waits up to `stop_grace` for it to exit
    /// - on timeout it is force-killed, plus a best-effort kill by artifact name
    pub stop_grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `debounce = 100ms` (typical editor save burst)
    /// - `stop_grace = 2s` (children are dev builds; they exit fast or not at all)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            stop_grace: Duration::from_secs(2),
            bus_capacity: 1024,
        }
    }
}
