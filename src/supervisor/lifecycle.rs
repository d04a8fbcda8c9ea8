//! # Lifecycle controller: the watch-session state machine.
//!
//! [`Supervisor`] owns the event bus, the subscriber fan-out, the trigger
//! queue, and the child slot, and drives the session through three phases:
//!
//! ```text
//!             ┌──────────── trigger (stop child first) ───────────┐
//!             ▼                                                   │
//!        ┌──────────┐  build ok   ┌─────────┐  child exit   ┌─────┴────────────┐
//!   ──►  │ Building │ ──────────► │ Running │ ────────────► │ AwaitingRestart  │
//!        └──────────┘             └─────────┘               └──────────────────┘
//!             ▲  │ build fail / spawn fail                        │
//!             │  └────────────────────────────────────────────────┤
//!             └──────────────── trigger (`rs` or file change) ────┘
//! ```
//!
//! ## Rules
//! - Exactly one of {build in flight, child running, restart channel
//!   listening} holds at any instant.
//! - Triggers are consumed in arrival order; triggers that arrive during a
//!   build are coalesced into one immediate rebuild (the artifact they raced
//!   is already stale).
//! - The restart channel exists only in `AwaitingRestart` and is torn down
//!   before a build begins, so a manual trigger during `Building` or
//!   `Running` is structurally impossible.
//! - An OS shutdown signal ends the loop from any phase; a build in flight
//!   finishes first (builds are not cancelled mid-flight).
//! - Shutdown drains the bus forwarder and every subscriber queue before
//!   returning, so the final lines are never dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::compile;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::supervisor::child::ChildSlot;
use crate::supervisor::shutdown;
use crate::target::BuildTarget;
use crate::triggers::{RestartChannel, Trigger, TriggerKind, spawn_watcher};

/// Trigger queue depth. Deeper than any realistic burst; the debouncer and
/// the drain-and-coalesce policy keep it near-empty anyway.
const TRIGGER_QUEUE: usize = 16;

/// The three session phases. The mutual-exclusion invariant maps one
/// resource to each: Building holds the compiler, Running holds the child
/// slot, AwaitingRestart holds the restart channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A compile is in flight.
    Building,
    /// The compiled program is running.
    Running,
    /// Nothing is active; listening for `rs` or a file change.
    AwaitingRestart,
}

impl Phase {
    /// Where a finished build leads.
    pub(crate) fn after_build(success: bool) -> Phase {
        if success {
            Phase::Running
        } else {
            Phase::AwaitingRestart
        }
    }

    /// Where a self-terminated child leads.
    pub(crate) fn on_child_exit() -> Phase {
        Phase::AwaitingRestart
    }

    /// Where any trigger leads.
    pub(crate) fn on_trigger() -> Phase {
        Phase::Building
    }
}

/// Coordinates triggers, builds, the child process, and event delivery for
/// one watch session.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    target: BuildTarget,
    triggers_tx: mpsc::Sender<Trigger>,
    triggers_rx: mpsc::Receiver<Trigger>,
}

impl Supervisor {
    /// Creates a supervisor for `target` with the given subscribers.
    pub fn new(cfg: Config, target: BuildTarget, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let (triggers_tx, triggers_rx) = mpsc::channel(TRIGGER_QUEUE);
        Self {
            cfg,
            bus,
            subs,
            target,
            triggers_tx,
            triggers_rx,
        }
    }

    /// Runs the session until an OS shutdown signal arrives.
    ///
    /// The initial phase is `Building`: the first compile starts immediately,
    /// mirroring an explicit first run.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let Supervisor {
            cfg,
            bus,
            subs,
            target,
            triggers_tx,
            mut triggers_rx,
        } = self;

        // Bus → subscriber fan-out. Subscribe synchronously so no event
        // published below can be missed.
        let drain_token = CancellationToken::new();
        let fan_out = tokio::spawn(fan_out_events(
            bus.subscribe(),
            Arc::clone(&subs),
            drain_token.clone(),
        ));

        // The watcher handle must outlive the loop; dropping it detaches the
        // filesystem watch.
        let _watcher = spawn_watcher(
            &target.source,
            cfg.debounce,
            triggers_tx.clone(),
            bus.clone(),
        )?;

        let source_label = target.source.display().to_string();
        let artifact_label = target.artifact.display().to_string();
        bus.publish(Event::now(EventKind::WatchStarted).with_task(source_label.clone()));

        let shutdown_token = CancellationToken::new();
        {
            let token = shutdown_token.clone();
            let bus = bus.clone();
            tokio::spawn(async move {
                let _ = shutdown::wait_for_shutdown_signal().await;
                bus.publish(Event::now(EventKind::ShutdownRequested));
                token.cancel();
            });
        }

        let mut slot = ChildSlot::new();
        let mut restart: Option<RestartChannel> = None;
        let mut phase = Phase::Building;
        let mut cycle: u64 = 0;

        loop {
            if shutdown_token.is_cancelled() {
                break;
            }
            match phase {
                Phase::Building => {
                    if let Some(ch) = restart.take() {
                        ch.close();
                    }
                    cycle += 1;
                    let result = compile::build(&target, cycle, &bus).await;

                    if let Some(pending) = drain_pending(&mut triggers_rx) {
                        // The artifact is already stale; any number of queued
                        // triggers collapses into one rebuild.
                        bus.publish(restart_requested(&source_label, pending.kind));
                        continue;
                    }

                    phase = Phase::after_build(result.success);
                    if phase == Phase::Running {
                        match slot.start(&target.artifact, &target.program_args) {
                            Ok(()) => {
                                bus.publish(
                                    Event::now(EventKind::ChildStarted)
                                        .with_task(artifact_label.clone())
                                        .with_attempt(cycle),
                                );
                            }
                            Err(err) => {
                                bus.publish(
                                    Event::now(EventKind::SpawnFailed)
                                        .with_task(artifact_label.clone())
                                        .with_reason(err.to_string()),
                                );
                                restart = Some(open_restart(&bus, &triggers_tx));
                                phase = Phase::AwaitingRestart;
                            }
                        }
                    } else {
                        restart = Some(open_restart(&bus, &triggers_tx));
                    }
                }
                Phase::Running => {
                    tokio::select! {
                        status = slot.wait() => {
                            let reason = match status {
                                Ok(s) => s.to_string(),
                                Err(e) => format!("wait failed: {e}"),
                            };
                            bus.publish(
                                Event::now(EventKind::ChildExited)
                                    .with_task(artifact_label.clone())
                                    .with_reason(reason),
                            );
                            restart = Some(open_restart(&bus, &triggers_tx));
                            phase = Phase::on_child_exit();
                        }
                        trig = triggers_rx.recv() => {
                            let Some(trig) = trig else { break };
                            bus.publish(restart_requested(&source_label, trig.kind));
                            // stop() completes, fallback included, before the
                            // next build can start a replacement.
                            stop_child(
                                &mut slot,
                                cfg.stop_grace,
                                target.artifact_name(),
                                &bus,
                                &artifact_label,
                            )
                            .await;
                            phase = Phase::on_trigger();
                        }
                        _ = shutdown_token.cancelled() => break,
                    }
                }
                Phase::AwaitingRestart => {
                    tokio::select! {
                        trig = triggers_rx.recv() => {
                            let Some(trig) = trig else { break };
                            if let Some(ch) = restart.take() {
                                ch.close();
                            }
                            bus.publish(restart_requested(&source_label, trig.kind));
                            phase = Phase::on_trigger();
                        }
                        _ = shutdown_token.cancelled() => break,
                    }
                }
            }
        }

        if let Some(ch) = restart.take() {
            ch.close();
        }
        slot.stop(cfg.stop_grace, target.artifact_name()).await;

        // Everything published above is already in the bus queue; drain the
        // forwarder, then the subscriber workers, before returning.
        drain_token.cancel();
        let _ = fan_out.await;
        if let Ok(subs) = Arc::try_unwrap(subs) {
            subs.shutdown().await;
        }
        Ok(())
    }
}

/// Forwards bus events to the subscriber set.
///
/// Runs until the bus closes or `drain` fires; falling behind the bus skips
/// the overrun events and keeps forwarding. The lag is reported to the
/// subscribers directly rather than republished on the bus it just fell
/// behind on. After `drain` fires, everything still queued is delivered
/// before the task ends.
async fn fan_out_events(
    mut rx: broadcast::Receiver<Event>,
    subs: Arc<SubscriberSet>,
    drain: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = drain.cancelled() => break,
            msg = rx.recv() => match msg {
                Ok(ev) => subs.emit(&ev),
                Err(broadcast::error::RecvError::Closed) => return,
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    subs.emit(&Event::subscriber_overflow("fan_out", "bus_lagged"));
                    continue;
                }
            }
        }
    }
    loop {
        match rx.try_recv() {
            Ok(ev) => subs.emit(&ev),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => break,
        }
    }
}

/// Stops the running child, then reports it. The event follows the stop so
/// subscribers ordering by `seq` see the child gone before the notice.
async fn stop_child(
    slot: &mut ChildSlot,
    grace: Duration,
    artifact_name: &str,
    bus: &Bus,
    artifact_label: &str,
) {
    slot.stop(grace, artifact_name).await;
    bus.publish(Event::now(EventKind::ChildStopped).with_task(artifact_label.to_string()));
}

/// Empties the trigger queue, returning the first queued trigger if any.
fn drain_pending(rx: &mut mpsc::Receiver<Trigger>) -> Option<Trigger> {
    let mut first = None;
    while let Ok(trig) = rx.try_recv() {
        first.get_or_insert(trig);
    }
    first
}

fn restart_requested(source_label: &str, kind: TriggerKind) -> Event {
    Event::now(EventKind::RestartRequested)
        .with_task(source_label.to_string())
        .with_trigger(kind)
}

fn open_restart(bus: &Bus, triggers: &mpsc::Sender<Trigger>) -> RestartChannel {
    bus.publish(Event::now(EventKind::AwaitingRestart));
    RestartChannel::open(triggers.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counting {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn test_build_outcome_decides_the_next_phase() {
        assert_eq!(Phase::after_build(true), Phase::Running);
        assert_eq!(Phase::after_build(false), Phase::AwaitingRestart);
    }

    #[test]
    fn test_child_exit_leads_to_awaiting_restart() {
        assert_eq!(Phase::on_child_exit(), Phase::AwaitingRestart);
    }

    #[test]
    fn test_any_trigger_leads_to_building() {
        assert_eq!(Phase::on_trigger(), Phase::Building);
    }

    #[tokio::test]
    async fn test_drain_coalesces_queued_triggers_to_the_first() {
        let (tx, mut rx) = mpsc::channel(TRIGGER_QUEUE);
        tx.try_send(Trigger::now(TriggerKind::FileChanged)).unwrap();
        tx.try_send(Trigger::now(TriggerKind::FileChanged)).unwrap();
        tx.try_send(Trigger::now(TriggerKind::ManualRestart)).unwrap();

        let first = drain_pending(&mut rx).expect("queued triggers");
        assert_eq!(first.kind, TriggerKind::FileChanged);
        // The queue is empty afterwards: one rebuild for the whole burst.
        assert!(drain_pending(&mut rx).is_none());
    }

    #[tokio::test]
    async fn test_empty_queue_drains_to_none() {
        let (_tx, mut rx) = mpsc::channel::<Trigger>(TRIGGER_QUEUE);
        assert!(drain_pending(&mut rx).is_none());
    }

    #[tokio::test]
    async fn test_fan_out_outlives_a_bus_lag() {
        let bus = Bus::new(2);
        let rx = bus.subscribe();
        let hits = Arc::new(AtomicUsize::new(0));
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Counting(hits.clone()))];
        let set = Arc::new(SubscriberSet::new(subs, bus.clone()));

        // Overrun the capacity-2 bus before the forwarder gets to run; its
        // first recv comes back lagged.
        for _ in 0..5 {
            bus.publish(Event::now(EventKind::BuildStarted));
        }
        let drain = CancellationToken::new();
        let forwarder = tokio::spawn(fan_out_events(rx, Arc::clone(&set), drain.clone()));
        bus.publish(Event::now(EventKind::BuildSucceeded));

        drain.cancel();
        forwarder.await.unwrap();
        match Arc::try_unwrap(set) {
            Ok(set) => set.shutdown().await,
            Err(_) => panic!("forwarder still holds the set"),
        }

        // The two retained events and the one published after the lag all
        // got through; a forwarder that dies on lag delivers none of them.
        assert!(hits.load(Ordering::SeqCst) >= 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_stopped_is_reported_after_the_stop_completes() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let mut slot = ChildSlot::new();
        let args = vec!["-c".to_string(), "sleep 5".to_string()];
        slot.start(std::path::Path::new("/bin/sh"), &args).unwrap();

        stop_child(&mut slot, Duration::from_secs(2), "", &bus, "prog").await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ChildStopped);
        assert_eq!(ev.task.as_deref(), Some("prog"));
        // The slot is already free when the event becomes visible.
        let again = vec!["-c".to_string(), "exit 0".to_string()];
        slot.start(std::path::Path::new("/bin/sh"), &again).unwrap();
    }
}
