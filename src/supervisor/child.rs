//! # ChildSlot: the single in-flight child process.
//!
//! [`ChildSlot`] owns the one `Option<Child>` the whole program has. The
//! at-most-one invariant is enforced here: `start` refuses an occupied slot,
//! and `stop` clears the slot unconditionally, even when termination fails,
//! so a failed kill can never leave a phantom second handle.
//!
//! ## Stop escalation
//! ```text
//! SIGTERM ──► wait up to grace ──► exited? done
//!                               └─► SIGKILL handle + kill-by-name fallback
//! ```
//!
//! The name-based fallback exists because the direct handle may reference a
//! process that already forked or detached. It matches by artifact *name* and
//! can therefore hit an unrelated process with the same name; this stays
//! best-effort and its errors are swallowed.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use tokio::io;
use tokio::process::{Child, Command};
use tokio::time;

use crate::error::RuntimeError;

/// Exclusive owner of the currently running compiled program, if any.
#[derive(Debug, Default)]
pub struct ChildSlot {
    child: Option<Child>,
}

impl ChildSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a child handle is live.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Spawns `program` with `args`, stdio fully inherited so the program
    /// behaves as if invoked interactively.
    ///
    /// ## Errors
    /// - [`RuntimeError::SlotOccupied`] if a child is already live (the
    ///   lifecycle must stop it first)
    /// - [`RuntimeError::Spawn`] if the artifact cannot be executed
    pub fn start(&mut self, program: &Path, args: &[String]) -> Result<(), RuntimeError> {
        if self.child.is_some() {
            return Err(RuntimeError::SlotOccupied);
        }
        let child = Command::new(invocation(program))
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .map_err(RuntimeError::Spawn)?;
        self.child = Some(child);
        Ok(())
    }

    /// Resolves when the child exits on its own, clearing the slot.
    ///
    /// Pends forever on an empty slot, so it is safe as a `select!` arm in
    /// states where no child exists. Cancel-safe: a cancelled wait leaves the
    /// handle in place.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let Some(child) = self.child.as_mut() else {
            return std::future::pending().await;
        };
        let status = child.wait().await;
        self.child = None;
        status
    }

    /// Stops the child: graceful signal, then forced kill after `grace`,
    /// plus the best-effort kill-by-name fallback. Clears the slot
    /// unconditionally; all termination errors are swallowed.
    ///
    /// Completes only after the fallback has finished, so a follow-up
    /// `start` never races the old process over shared resources.
    pub async fn stop(&mut self, grace: Duration, artifact_name: &str) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        terminate_gracefully(&mut child);
        match time::timeout(grace, child.wait()).await {
            Ok(_status) => {}
            Err(_elapsed) => {
                let _ = child.kill().await;
                kill_by_name(artifact_name).await;
            }
        }
    }
}

/// Relative artifacts are spawned as `./name`: the artifact lives in the
/// current directory, and a bare name would search PATH instead.
fn invocation(program: &Path) -> PathBuf {
    if program.is_absolute() {
        program.to_path_buf()
    } else {
        Path::new(".").join(program)
    }
}

/// Sends the graceful termination signal (SIGTERM on unix).
#[cfg(unix)]
fn terminate_gracefully(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
}

/// Best approximation of a graceful stop where no TERM-equivalent exists.
#[cfg(not(unix))]
fn terminate_gracefully(child: &mut Child) {
    let _ = child.start_kill();
}

/// Force-kills any process matching the artifact name. Best-effort: absent
/// tools, no match, and permission errors are all ignored.
async fn kill_by_name(name: &str) {
    if name.is_empty() {
        return;
    }
    #[cfg(unix)]
    let mut cmd = Command::new("pkill");
    #[cfg(unix)]
    cmd.args(["-KILL", "-x", name]);

    #[cfg(not(unix))]
    let mut cmd = Command::new("taskkill");
    #[cfg(not(unix))]
    cmd.args(["/F", "/IM", name]);

    let _ = cmd.status().await;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh() -> &'static Path {
        Path::new("/bin/sh")
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_start_on_occupied_slot_errors() {
        let mut slot = ChildSlot::new();
        slot.start(sh(), &args(&["-c", "sleep 5"])).unwrap();
        let err = slot.start(sh(), &args(&["-c", "exit 0"])).unwrap_err();
        assert!(matches!(err, RuntimeError::SlotOccupied));
        slot.stop(Duration::from_millis(200), "").await;
    }

    #[tokio::test]
    async fn test_wait_clears_the_slot() {
        let mut slot = ChildSlot::new();
        slot.start(sh(), &args(&["-c", "exit 7"])).unwrap();
        let status = slot.wait().await.unwrap();
        assert_eq!(status.code(), Some(7));
        assert!(!slot.is_running());
    }

    #[tokio::test]
    async fn test_stop_then_start_replaces_the_child() {
        let mut slot = ChildSlot::new();
        slot.start(sh(), &args(&["-c", "sleep 5"])).unwrap();
        slot.stop(Duration::from_millis(500), "cwatch-test-no-such-name")
            .await;
        assert!(!slot.is_running());
        // The slot is free again: the replace path is stop → start.
        slot.start(sh(), &args(&["-c", "exit 0"])).unwrap();
        slot.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_on_empty_slot_is_a_no_op() {
        let mut slot = ChildSlot::new();
        slot.stop(Duration::from_millis(10), "whatever").await;
        assert!(!slot.is_running());
    }

    #[tokio::test]
    async fn test_spawn_failure_reports_and_leaves_slot_empty() {
        let mut slot = ChildSlot::new();
        let err = slot
            .start(Path::new("/no/such/binary"), &[])
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn(_)));
        assert!(!slot.is_running());
    }
}
