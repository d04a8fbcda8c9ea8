//! Error types used by the cwatch runtime.
//!
//! Two enums, matching the propagation policy of the tool:
//!
//! - [`UsageError`]: argv problems; fatal, reported before any async
//!   machinery starts.
//! - [`RuntimeError`]: failures in the supervisor runtime itself.
//!
//! Compilation failures and child crashes are *not* errors: they are absorbed
//! by the lifecycle state machine and surfaced as events, keeping the watch
//! loop alive.

use std::path::PathBuf;
use thiserror::Error;

/// # Errors in the invocation surface.
///
/// These terminate the process with a nonzero exit code and a usage message.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UsageError {
    /// No source file argument was given.
    #[error("missing source file argument")]
    MissingSource,

    /// The source file has an extension no known compiler maps to.
    #[error("only .c and .cpp files are supported (got {path:?})")]
    UnsupportedExtension {
        /// The offending path as given on the command line.
        path: PathBuf,
    },
}

impl UsageError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            UsageError::MissingSource => "usage_missing_source",
            UsageError::UnsupportedExtension { .. } => "usage_unsupported_extension",
        }
    }
}

/// # Errors produced by the supervisor runtime.
///
/// [`RuntimeError::SlotOccupied`] signals a lifecycle bug (the controller must
/// never start a child while one is live); [`RuntimeError::Watch`] wraps a
/// watcher initialization failure, which is fatal at startup since there is
/// nothing to supervise without it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A child process is already live in the slot.
    #[error("a child process is already running; it must be stopped first")]
    SlotOccupied,

    /// The compiled artifact could not be spawned.
    #[error("failed to spawn the compiled program: {0}")]
    Spawn(#[source] std::io::Error),

    /// The filesystem watcher could not be created or attached.
    #[error("failed to watch source file: {0}")]
    Watch(#[from] notify::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::SlotOccupied => "runtime_slot_occupied",
            RuntimeError::Spawn(_) => "runtime_spawn",
            RuntimeError::Watch(_) => "runtime_watch",
        }
    }
}
