//! # Trigger sources: where rebuild requests come from.
//!
//! A [`Trigger`] is a discrete request for a rebuild-and-rerun cycle. Two
//! origins feed the same mpsc queue:
//!
//! - the debounced filesystem watcher ([`spawn_watcher`]),
//! - the interactive restart channel ([`RestartChannel`]), which only exists
//!   while no child process is running.
//!
//! Neither origin decides what happens next; the lifecycle controller
//! consumes triggers in arrival order.

mod debounce;
mod restart;
mod watcher;

pub use debounce::Debouncer;
pub use restart::RestartChannel;
pub use watcher::spawn_watcher;

use std::time::Instant;

/// What kind of event requested the rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// The watched source file changed on disk.
    FileChanged,
    /// A human typed `rs` on the restart channel.
    ManualRestart,
}

impl TriggerKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TriggerKind::FileChanged => "file_changed",
            TriggerKind::ManualRestart => "manual_restart",
        }
    }
}

/// A rebuild request. Ephemeral: consumed immediately by the lifecycle loop.
#[derive(Debug, Clone, Copy)]
pub struct Trigger {
    /// Origin of the request.
    pub kind: TriggerKind,
    /// When the request was observed.
    pub at: Instant,
}

impl Trigger {
    /// Creates a trigger stamped with the current instant.
    pub fn now(kind: TriggerKind) -> Self {
        Self {
            kind,
            at: Instant::now(),
        }
    }
}
