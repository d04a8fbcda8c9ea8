//! # Runtime events emitted by the supervisor, build runner, and triggers.
//!
//! [`EventKind`] classifies everything that happens in a watch session:
//! build cycles, child process lifecycle, restart triggers, and subscriber
//! plumbing. [`Event`] carries the metadata (timestamps, paths, reasons,
//! cycle numbers).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; subscribers can use it to restore publication order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::triggers::TriggerKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber plumbing ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Session ===
    /// The watch session started.
    ///
    /// Sets: `task` (source path).
    WatchStarted,

    /// The filesystem watcher died; manual restarts keep working.
    ///
    /// Sets: `reason` (watch error text).
    WatcherDead,

    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    // === Build cycle ===
    /// A compile started.
    ///
    /// Sets: `task` (source path), `attempt` (cycle number, 1-based).
    BuildStarted,

    /// One line of compiler stderr, streamed as it arrives.
    ///
    /// Sets: `reason` (the line).
    BuildDiagnostic,

    /// The compiler exited with status zero.
    ///
    /// Sets: `task` (artifact path), `attempt`.
    BuildSucceeded,

    /// The compiler exited nonzero or could not be spawned.
    ///
    /// Sets: `task` (source path), `attempt`, `reason`.
    BuildFailed,

    // === Child process ===
    /// The compiled program was started.
    ///
    /// Sets: `task` (artifact path), `attempt`.
    ChildStarted,

    /// The compiled artifact could not be spawned.
    ///
    /// Sets: `task` (artifact path), `reason` (io error text).
    SpawnFailed,

    /// The child exited on its own.
    ///
    /// Sets: `task` (artifact path), `reason` (exit status display).
    ChildExited,

    /// The child was stopped by the supervisor to make way for a rebuild.
    ///
    /// Sets: `task` (artifact path).
    ChildStopped,

    // === Triggers ===
    /// A rebuild-and-rerun cycle was requested.
    ///
    /// Sets: `task` (source path), `trigger` (file change vs manual).
    RestartRequested,

    /// Entered the awaiting-restart state; the `rs` channel is listening.
    AwaitingRestart,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Subject path or name (source, artifact, or subscriber, per kind).
    pub task: Option<Arc<str>>,
    /// Human-readable reason (diagnostics, exit status, errors).
    pub reason: Option<Arc<str>>,
    /// Compile/run cycle number (1-based, monotonic for the session).
    pub attempt: Option<u64>,
    /// Which origin requested the restart (for [`EventKind::RestartRequested`]).
    pub trigger: Option<TriggerKind>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            attempt: None,
            trigger: None,
        }
    }

    /// Attaches a subject path or name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a cycle number.
    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches the trigger origin.
    #[inline]
    pub fn with_trigger(mut self, kind: TriggerKind) -> Self {
        self.trigger = Some(kind);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events about the subscriber plumbing itself; these must not
    /// generate further overflow events (recursion guard).
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
