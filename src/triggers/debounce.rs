//! # Burst coalescing for filesystem events.
//!
//! Editors emit several write events per save (truncate, write, rename,
//! metadata). [`Debouncer`] admits the first event of a burst and drops the
//! rest of the window, so N events within the window yield exactly one
//! rebuild trigger.
//!
//! Leading-edge: the first event passes immediately; nothing is delayed.

use std::time::{Duration, Instant};

/// Leading-edge debouncer over a fixed window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_admit: Option<Instant>,
}

impl Debouncer {
    /// Creates a debouncer with the given coalescing window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_admit: None,
        }
    }

    /// Returns `true` if an event observed at `now` should be admitted.
    ///
    /// Admission records `now` as the new window start. Events inside the
    /// window of the last admitted event are dropped, never queued.
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_admit {
            Some(prev) if now.duration_since(prev) < self.window => false,
            _ => {
                self.last_admit = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_is_admitted() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        assert!(d.accept(Instant::now()));
    }

    #[test]
    fn test_burst_within_window_yields_one() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let mut admitted = 0;
        for i in 0..10 {
            if d.accept(t0 + Duration::from_millis(i * 5)) {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_event_after_window_is_admitted_again() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(d.accept(t0));
        assert!(!d.accept(t0 + Duration::from_millis(99)));
        assert!(d.accept(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_window_restarts_from_last_admitted_event() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(d.accept(t0));
        assert!(d.accept(t0 + Duration::from_millis(150)));
        // 150..250 is the new window, so 200 is still inside it.
        assert!(!d.accept(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_zero_window_admits_everything() {
        let mut d = Debouncer::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(d.accept(t0));
        assert!(d.accept(t0));
    }
}
