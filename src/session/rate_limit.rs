//! Rolling-window counters for handshake rate limiting (spec.md §4.4),
//! grounded on the teacher's `network/tor_dos_protection.rs`
//! sliding-window-of-`Instant`s pattern.

use std::time::{Duration, Instant};

/// Tracks timestamps in a rolling window and answers "would one more
/// event right now exceed `limit`?" without assuming a fixed tick.
pub struct RollingWindow {
    window: Duration,
    limit: u32,
    events: Vec<Instant>,
}

impl RollingWindow {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { window, limit, events: Vec::new() }
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.events.retain(|t| now.duration_since(*t) <= window);
    }

    /// If the window has room, records `now` as an event and returns
    /// `true`. Otherwise leaves state untouched and returns `false`.
    pub fn try_record(&mut self, now: Instant) -> bool {
        self.prune(now);
        if self.events.len() as u32 >= self.limit {
            return false;
        }
        self.events.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let mut w = RollingWindow::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(w.try_record(now));
        assert!(w.try_record(now));
        assert!(!w.try_record(now));
    }

    #[test]
    fn old_events_age_out_of_the_window() {
        let mut w = RollingWindow::new(1, Duration::from_millis(50));
        let t0 = Instant::now();
        assert!(w.try_record(t0));
        assert!(!w.try_record(t0));
        let t1 = t0 + Duration::from_millis(60);
        assert!(w.try_record(t1));
    }
}
