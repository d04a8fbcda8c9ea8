//! # Filesystem watcher: source file changes → debounced triggers.
//!
//! Bridges a `notify` watcher (which calls back on its own thread) into the
//! async trigger queue:
//!
//! ```text
//! notify thread ── try_send ──► raw mpsc ──► forward task ──► Debouncer ──► triggers
//! ```
//!
//! The returned [`RecommendedWatcher`] must be kept alive by the caller;
//! dropping it detaches the watch and ends the forward task.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::triggers::{Debouncer, Trigger, TriggerKind};

/// Raw-event queue between the notify thread and the forward task. Overflow
/// is harmless: the debouncer would drop the excess anyway.
const RAW_QUEUE: usize = 64;

/// Watches `source` and forwards debounced [`TriggerKind::FileChanged`]
/// triggers into `triggers`.
///
/// Watch errors after startup are published as [`EventKind::WatcherDead`];
/// the session keeps running on manual restarts. Failure to create or attach
/// the watcher is returned as [`RuntimeError::Watch`].
pub fn spawn_watcher(
    source: &Path,
    window: Duration,
    triggers: mpsc::Sender<Trigger>,
    bus: Bus,
) -> Result<RecommendedWatcher, RuntimeError> {
    let (raw_tx, mut raw_rx) = mpsc::channel::<notify::Result<()>>(RAW_QUEUE);

    // Watch the parent directory, not the file: editors that save by
    // replacing the file (remove+create) would otherwise detach the watch.
    let canonical = source
        .canonicalize()
        .map_err(|e| RuntimeError::Watch(notify::Error::io(e)))?;
    let parent = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let forward = match res {
            // Saves show up as modify, or as remove+create for editors that
            // replace the file. Access events are noise.
            Ok(ev) if ev.kind.is_modify() || ev.kind.is_create() || ev.kind.is_remove() => {
                if !ev.paths.iter().any(|p| p == &canonical) {
                    return;
                }
                Ok(())
            }
            Ok(_) => return,
            Err(e) => Err(e),
        };
        let _ = raw_tx.try_send(forward);
    })?;
    watcher.watch(&parent, RecursiveMode::NonRecursive)?;

    tokio::spawn(async move {
        let mut debounce = Debouncer::new(window);
        while let Some(raw) = raw_rx.recv().await {
            match raw {
                Ok(()) => {
                    if debounce.accept(Instant::now())
                        && triggers
                            .send(Trigger::now(TriggerKind::FileChanged))
                            .await
                            .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    bus.publish(Event::now(EventKind::WatcherDead).with_reason(e.to_string()));
                    break;
                }
            }
        }
        // Channel closed: the watcher was dropped (session shutdown).
    });

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_file_write_produces_a_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        std::fs::write(&path, "int main(){}\n").unwrap();

        let bus = Bus::new(8);
        let (tx, mut rx) = mpsc::channel(16);
        let _watcher = spawn_watcher(&path, Duration::from_millis(50), tx, bus).unwrap();

        // Give the watch a moment to attach before mutating the file.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "// edited").unwrap();
        f.sync_all().unwrap();
        drop(f);

        let trig = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no trigger within 5s")
            .expect("trigger channel closed");
        assert_eq!(trig.kind, TriggerKind::FileChanged);
    }

    #[tokio::test]
    async fn test_missing_path_fails_at_startup() {
        let bus = Bus::new(8);
        let (tx, _rx) = mpsc::channel(16);
        let err = spawn_watcher(
            Path::new("definitely/not/here.c"),
            Duration::from_millis(50),
            tx,
            bus,
        );
        assert!(matches!(err, Err(RuntimeError::Watch(_))));
    }
}
