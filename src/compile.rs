//! # Build runner: one compiler invocation per cycle.
//!
//! Executes one compile of a [`BuildTarget`], publishing lifecycle events to
//! the [`Bus`]:
//!
//! ```text
//! BuildStarted → [compiler runs, stderr streamed as BuildDiagnostic]
//!              → BuildSucceeded (exit 0)
//!              → BuildFailed    (nonzero exit, or the compiler is missing)
//! ```
//!
//! ## Rules
//! - Argument order is fixed: source, `-o`, artifact, then user flags, so
//!   flags can override the defaults.
//! - Success ⇔ exit status zero; the artifact is assumed present on success,
//!   never verified.
//! - Failures are not retried here; the lifecycle falls back to
//!   awaiting-restart.

use std::ffi::OsString;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::events::{Bus, Event, EventKind};
use crate::target::BuildTarget;

/// Outcome of one compile. Consumed once by the lifecycle, then discarded.
#[derive(Debug)]
pub struct BuildResult {
    /// True iff the compiler exited with status zero.
    pub success: bool,
    /// Everything the compiler wrote to stderr (warnings included).
    pub diagnostics: String,
}

/// Compiler argv, in the contractual order: source, `-o` artifact, user flags.
pub fn command_args(target: &BuildTarget) -> Vec<OsString> {
    let mut args = vec![
        target.source.as_os_str().to_os_string(),
        OsString::from("-o"),
        target.artifact.as_os_str().to_os_string(),
    ];
    args.extend(target.compiler_flags.iter().map(OsString::from));
    args
}

/// Runs one compile of `target`, streaming stderr lines to the bus as they
/// arrive and accumulating them into the result.
///
/// A spawn failure (compiler binary missing) is reported as a failed build
/// with the error text as diagnostics, not a crash: the session stays alive.
pub async fn build(target: &BuildTarget, cycle: u64, bus: &Bus) -> BuildResult {
    build_with(target.compiler.command(), target, cycle, bus).await
}

/// [`build`] with the compiler binary chosen by the caller.
async fn build_with(program: &str, target: &BuildTarget, cycle: u64, bus: &Bus) -> BuildResult {
    let source = target.source.display().to_string();
    bus.publish(
        Event::now(EventKind::BuildStarted)
            .with_task(source.clone())
            .with_attempt(cycle),
    );

    let mut child = match Command::new(program)
        .args(command_args(target))
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            let msg = format!("cannot run {program}: {e}");
            bus.publish(Event::now(EventKind::BuildDiagnostic).with_reason(msg.clone()));
            bus.publish(
                Event::now(EventKind::BuildFailed)
                    .with_task(source)
                    .with_attempt(cycle)
                    .with_reason(msg.clone()),
            );
            return BuildResult {
                success: false,
                diagnostics: msg,
            };
        }
    };

    let mut diagnostics = String::new();
    if let Some(stderr) = child.stderr.take() {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            bus.publish(Event::now(EventKind::BuildDiagnostic).with_reason(line.clone()));
            diagnostics.push_str(&line);
            diagnostics.push('\n');
        }
    }

    let status = child.wait().await;
    let success = matches!(&status, Ok(s) if s.success());
    if success {
        bus.publish(
            Event::now(EventKind::BuildSucceeded)
                .with_task(target.artifact.display().to_string())
                .with_attempt(cycle),
        );
    } else {
        let reason = match status {
            Ok(s) => format!("compiler exited with {s}"),
            Err(e) => format!("failed to await compiler: {e}"),
        };
        bus.publish(
            Event::now(EventKind::BuildFailed)
                .with_task(source)
                .with_attempt(cycle)
                .with_reason(reason),
        );
    }

    BuildResult {
        success,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_come_after_the_output_path() {
        let target = BuildTarget::from_args(
            ["file.c", "-O2", "-Wall"].map(String::from).to_vec(),
        )
        .unwrap();
        let args = command_args(&target);
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        let artifact = if cfg!(windows) { "file.exe" } else { "file" };
        assert_eq!(args, vec!["file.c", "-o", artifact, "-O2", "-Wall"]);
    }

    #[test]
    fn test_no_flags_is_just_the_output_path() {
        let target = BuildTarget::from_args(vec!["prog.cpp".to_string()]).unwrap();
        let args = command_args(&target);
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], OsString::from("-o"));
    }

    #[cfg(unix)]
    fn stub_compiler(dir: &tempfile::TempDir, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("cc-stub");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_a_successful_build() {
        let dir = tempfile::tempdir().unwrap();
        let cc = stub_compiler(&dir, "exit 0");
        let target = BuildTarget::from_args(vec!["main.c".to_string()]).unwrap();
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let result = build_with(&cc, &target, 1, &bus).await;

        assert!(result.success);
        assert!(result.diagnostics.is_empty());
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::BuildStarted);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::BuildSucceeded);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_is_streamed_and_accumulated_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cc = stub_compiler(
            &dir,
            "echo 'error: no semicolon' >&2\necho 'note: here' >&2\nexit 1",
        );
        let target = BuildTarget::from_args(vec!["main.c".to_string()]).unwrap();
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let result = build_with(&cc, &target, 1, &bus).await;

        assert!(!result.success);
        assert!(result.diagnostics.contains("error: no semicolon"));
        assert!(result.diagnostics.contains("note: here"));

        // Each stderr line went out as its own diagnostic event.
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::BuildStarted);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::BuildDiagnostic);
        assert_eq!(first.reason.as_deref(), Some("error: no semicolon"));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::BuildDiagnostic);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::BuildFailed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_compiler_is_a_failed_build_not_a_crash() {
        let target = BuildTarget::from_args(vec!["main.c".to_string()]).unwrap();
        let bus = Bus::new(8);

        let result = build_with("/no/such/compiler", &target, 1, &bus).await;

        assert!(!result.success);
        assert!(result.diagnostics.contains("cannot run /no/such/compiler"));
    }
}
