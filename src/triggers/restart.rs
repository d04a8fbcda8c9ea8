//! # Interactive restart channel.
//!
//! [`RestartChannel`] reads line-oriented input from stdin while no child
//! process is running; a line that trims to exactly `rs` yields a
//! [`TriggerKind::ManualRestart`] trigger, anything else is silently ignored.
//!
//! ## Lifecycle
//! Created on entry to the awaiting-restart state, cancelled the instant a
//! new build begins. The channel never coexists with a live child: the child
//! inherits stdin, and two readers would race over the same stream.
//!
//! Cancellation cannot un-issue an in-flight blocking stdin read
//! (`tokio::io::stdin` reads on a blocking thread), so one line typed at the
//! exact teardown instant may be consumed and dropped.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::triggers::{Trigger, TriggerKind};

/// The literal restart command, compared after trimming whitespace.
const RESTART_TOKEN: &str = "rs";

/// Handle to the stdin reader task. Dropping or [`close`](Self::close)-ing it
/// cancels the reader.
#[derive(Debug)]
pub struct RestartChannel {
    token: CancellationToken,
}

impl RestartChannel {
    /// Spawns a stdin reader that sends one [`TriggerKind::ManualRestart`]
    /// into `triggers` when the restart command is typed.
    pub fn open(triggers: mpsc::Sender<Trigger>) -> Self {
        let token = CancellationToken::new();
        let reader_token = token.clone();
        tokio::spawn(async move {
            let reader = BufReader::new(io::stdin());
            drive_lines(reader, triggers, reader_token).await;
        });
        Self { token }
    }

    /// Tears the channel down; pending reads are abandoned.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl Drop for RestartChannel {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Reads lines until the restart command is seen (one trigger, then done),
/// input ends, or the token is cancelled.
async fn drive_lines<R>(reader: R, triggers: mpsc::Sender<Trigger>, token: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim() == RESTART_TOKEN => {
                    let _ = triggers.send(Trigger::now(TriggerKind::ManualRestart)).await;
                    break;
                }
                Ok(Some(_)) => {} // everything else is ignored, not an error
                Ok(None) | Err(_) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn run_reader(input: &'static [u8]) -> mpsc::Receiver<Trigger> {
        let (tx, rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        drive_lines(BufReader::new(input), tx, token).await;
        rx
    }

    #[tokio::test]
    async fn test_rs_line_triggers_once() {
        let mut rx = run_reader(b"hello\n  rs  \nrs\n").await;
        let trig = rx.recv().await.expect("expected a manual trigger");
        assert_eq!(trig.kind, TriggerKind::ManualRestart);
        // Reader stops after the first hit; the second `rs` is never read.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_other_input_is_ignored() {
        let mut rx = run_reader(b"restart\nplease rs now\nr s\n").await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_reader() {
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        token.cancel();
        // The write half stays open and silent, so the read pends forever;
        // only the cancelled token can end the reader.
        let (_writer, reader) = tokio::io::duplex(16);
        timeout(
            Duration::from_secs(1),
            drive_lines(BufReader::new(reader), tx, token),
        )
        .await
        .expect("reader did not stop on cancellation");
        assert!(rx.try_recv().is_err());
    }
}
