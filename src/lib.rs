//! # cwatch
//!
//! **cwatch** is a development-loop supervisor for single-file C/C++
//! programs: it watches one source file, recompiles it on change, runs the
//! resulting executable with its stdio attached to the terminal, and lets a
//! human force a restart by typing `rs`.
//!
//! ## Architecture
//! ```text
//!   filesystem (notify)          stdin (`rs` lines)
//!         │                            │
//!   ┌─────▼──────┐             ┌───────▼────────┐
//!   │  watcher   │             │ RestartChannel │  (exists only while no
//!   │ + Debouncer│             │                │   child is running)
//!   └─────┬──────┘             └───────┬────────┘
//!         └──────────┬─────────────────┘
//!                    ▼
//!            trigger queue (mpsc, arrival order)
//!                    │
//!         ┌──────────▼──────────────────────────────────┐
//!         │ Supervisor (phase state machine)            │
//!         │   Building ── ok ──► Running ── exit ──┐    │
//!         │      ▲ │ fail                          ▼    │
//!         │      │ └────────────────► AwaitingRestart   │
//!         │      └───────── trigger ────────┘           │
//!         │                                             │
//!         │   ChildSlot: at most one live child;        │
//!         │   stop = SIGTERM → grace → kill (+ by-name) │
//!         └──────────┬──────────────────────────────────┘
//!                    │ publishes Events
//!                    ▼
//!            Bus (broadcast) ──► SubscriberSet ──► ConsoleReporter, ...
//! ```
//!
//! ## Invariants
//! - At most one live child process at any time; the handle is owned
//!   exclusively by the [`ChildSlot`].
//! - Exactly one of {build in flight, child running, restart channel
//!   listening} holds at any instant.
//! - Triggers are processed in arrival order; bursts within the debounce
//!   window collapse to one rebuild.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use cwatch::{BuildTarget, Config, ConsoleReporter, Subscribe, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let target = BuildTarget::from_args(std::env::args().skip(1))?;
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleReporter)];
//!     Supervisor::new(Config::default(), target, subs).run().await?;
//!     Ok(())
//! }
//! ```

mod compile;
mod config;
mod error;
mod events;
mod subscribers;
mod supervisor;
mod target;
mod triggers;

pub use compile::{BuildResult, build, command_args};
pub use config::Config;
pub use error::{RuntimeError, UsageError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{ConsoleReporter, Subscribe, SubscriberSet};
pub use supervisor::{ChildSlot, Phase, Supervisor};
pub use target::{BuildTarget, Compiler};
pub use triggers::{Debouncer, RestartChannel, Trigger, TriggerKind, spawn_watcher};
