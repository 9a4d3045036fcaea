//! Inbound packet rate limiting at the transport layer (spec.md §4.5):
//! a global ceiling plus a smaller per-peer ceiling, both rolling-window,
//! checked before any decode/crypto work on the inbound path.

use crate::primitives::lru_map::BoundedMap;
use crate::session::rate_limit::RollingWindow;
use std::time::{Duration, Instant};

const PER_DEVICE_WINDOW_CAPACITY: usize = 512;

pub struct InboundRateLimiter {
    global: RollingWindow,
    per_device: BoundedMap<String, RollingWindow>,
    per_device_limit: u32,
}

impl InboundRateLimiter {
    pub fn new(global_per_sec: u32, per_device_per_sec: u32) -> Self {
        Self {
            global: RollingWindow::new(global_per_sec, Duration::from_secs(1)),
            per_device: BoundedMap::new(PER_DEVICE_WINDOW_CAPACITY),
            per_device_limit: per_device_per_sec,
        }
    }

    /// `true` if this inbound packet is allowed; records it against both
    /// windows. A device with no prior window gets a fresh one.
    pub fn allow(&mut self, device_key: &str, now: Instant) -> bool {
        if !self.global.try_record(now) {
            return false;
        }
        if let Some(window) = self.per_device.get_mut(&device_key.to_string()) {
            window.try_record(now)
        } else {
            let mut window = RollingWindow::new(self.per_device_limit, Duration::from_secs(1));
            let allowed = window.try_record(now);
            self.per_device.insert(device_key.to_string(), window);
            allowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_device_cap_is_independent_of_other_devices() {
        let mut limiter = InboundRateLimiter::new(1000, 2);
        let now = Instant::now();
        assert!(limiter.allow("a", now));
        assert!(limiter.allow("a", now));
        assert!(!limiter.allow("a", now));
        assert!(limiter.allow("b", now));
    }

    #[test]
    fn global_cap_applies_across_devices() {
        let mut limiter = InboundRateLimiter::new(2, 1000);
        let now = Instant::now();
        assert!(limiter.allow("a", now));
        assert!(limiter.allow("b", now));
        assert!(!limiter.allow("c", now));
    }
}
