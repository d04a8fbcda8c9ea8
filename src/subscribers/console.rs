//! # Console reporter: the tool's user-facing output.
//!
//! [`ConsoleReporter`] turns bus events into the console line protocol:
//!
//! ```text
//! Watching main.c for changes...
//! Compiling main.c...
//! Compiled successfully: main
//! Running the program...
//!
//! Type 'rs' and press Enter to restart the program
//! File main.c changed! Recompiling...
//! Manual restart triggered...
//! ```
//!
//! Diagnostics and failures go to stderr, everything else to stdout.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Prints watch-session events in a human-readable form.
pub struct ConsoleReporter;

#[async_trait]
impl Subscribe for ConsoleReporter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::WatchStarted => {
                if let Some(task) = &e.task {
                    println!("Watching {task} for changes...");
                }
            }
            EventKind::BuildStarted => {
                if let Some(task) = &e.task {
                    println!("Compiling {task}...");
                }
            }
            EventKind::BuildDiagnostic => {
                if let Some(line) = &e.reason {
                    eprintln!("Compilation error: {line}");
                }
            }
            EventKind::BuildSucceeded => {
                if let Some(task) = &e.task {
                    println!("Compiled successfully: {task}");
                }
            }
            EventKind::BuildFailed => {
                eprintln!("Compilation failed.");
            }
            EventKind::ChildStarted => {
                println!("Running the program...\n");
            }
            EventKind::SpawnFailed => {
                eprintln!(
                    "Failed to run {}: {}",
                    e.task.as_deref().unwrap_or("the program"),
                    e.reason.as_deref().unwrap_or("unknown error"),
                );
            }
            EventKind::ChildStopped => {
                println!("Stopping the running program...");
            }
            EventKind::AwaitingRestart => {
                println!("\nType 'rs' and press Enter to restart the program");
            }
            EventKind::RestartRequested => {
                match e.trigger {
                    Some(crate::triggers::TriggerKind::ManualRestart) => {
                        println!("Manual restart triggered...");
                    }
                    _ => {
                        let task = e.task.as_deref().unwrap_or("the source file");
                        println!("File {task} changed! Recompiling...");
                    }
                }
            }
            EventKind::WatcherDead => {
                eprintln!(
                    "File watcher stopped ({}); 'rs' restarts still work",
                    e.reason.as_deref().unwrap_or("unknown error"),
                );
            }
            EventKind::ShutdownRequested => {
                println!("\nShutting down...");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                eprintln!(
                    "subscriber {}: {}",
                    e.task.as_deref().unwrap_or("?"),
                    e.reason.as_deref().unwrap_or("?"),
                );
            }
            // Child exits need no line of their own; the restart prompt
            // follows immediately.
            EventKind::ChildExited => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
