//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to subscribers concurrently without
//! blocking the publisher:
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Per-subscriber FIFO**: each subscriber sees events in order.
//! - **Overflow**: the event is dropped for that subscriber only and a
//!   `SubscriberOverflow` is published (unless the event itself is subscriber
//!   plumbing, to avoid recursion).
//! - **Isolation**: a slow or panicking subscriber doesn't affect the others;
//!   worker tasks catch panics via `catch_unwind` and keep going.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator: one bounded queue and one worker task per subscriber.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker task per subscriber.
    ///
    /// Workers run until their queue closes (see [`shutdown`](Self::shutdown)).
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        worker_bus.publish(Event::subscriber_panicked(name, info));
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops the channel senders so every worker sees its queue close, then
    /// awaits the workers. Events already queued are delivered before this
    /// returns.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// Queues the event for every subscriber without awaiting any of them.
    ///
    /// A full or closed queue drops the event for that subscriber and reports
    /// it, except when the event is itself subscriber plumbing.
    pub fn emit(&self, ev: &Event) {
        let shared = Arc::new(ev.clone());
        for ch in &self.channels {
            let dropped = match ch.sender.try_send(Arc::clone(&shared)) {
                Ok(()) => None,
                Err(TrySendError::Full(_)) => Some("full"),
                Err(TrySendError::Closed(_)) => Some("closed"),
            };
            if let Some(reason) = dropped {
                if !ev.is_subscriber_event() {
                    self.bus.publish(Event::subscriber_overflow(ch.name, reason));
                }
            }
        }
    }
}
