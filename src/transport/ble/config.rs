//! BLE-specific tunables (spec.md §4.5), pulled out into a config struct
//! with a `Default` matching the spec's constants rather than literals
//! scattered through [`super::transport`] — same pattern as
//! `crypto/duress.rs`'s `DuressConfig` in the teacher.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct BleConfig {
    /// MTU negotiated on every central connection.
    pub mtu_target: u16,
    /// Below this, a connection is usable but logged as a warning.
    pub mtu_warn_below: u16,
    /// Active-scan duration before pausing.
    pub scan_active: Duration,
    /// Pause between scan windows. Deliberately overlaps the tail of the
    /// active window so there is no blind gap (spec.md §4.5).
    pub scan_pause: Duration,
    /// No send/receive activity for this long -> enter idle scanning.
    pub idle_after: Duration,
    /// iOS central-count ceiling on simultaneous peripheral links.
    pub max_peripheral_links: usize,
    /// A peripheral client that hasn't completed the handshake within
    /// this long is disconnected.
    pub handshake_timeout: Duration,
    pub handshake_timeout_check_interval: Duration,
    /// An authenticated peripheral client silent for this long is evicted.
    pub stale_after: Duration,
    pub stale_check_interval: Duration,
    /// Global inbound packets per second, across all peers.
    pub global_inbound_per_sec: u32,
    /// Per-peer inbound packets per second (smaller than the global cap).
    pub per_peer_inbound_per_sec: u32,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            mtu_target: 512,
            mtu_warn_below: 256,
            scan_active: Duration::from_secs(14),
            scan_pause: Duration::from_millis(14_500),
            idle_after: Duration::from_secs(30),
            max_peripheral_links: 6,
            handshake_timeout: Duration::from_secs(30),
            handshake_timeout_check_interval: Duration::from_secs(15),
            stale_after: Duration::from_secs(60),
            stale_check_interval: Duration::from_secs(30),
            global_inbound_per_sec: 100,
            per_peer_inbound_per_sec: 20,
        }
    }
}

/// Timeouts wrapped around every radio I/O suspension point (spec.md §5
/// "every such await is wrapped with an explicit timeout").
#[derive(Clone, Copy, Debug)]
pub struct IoTimeouts {
    pub adapter_on: Duration,
    pub write_with_response: Duration,
}

impl Default for IoTimeouts {
    fn default() -> Self {
        Self {
            adapter_on: Duration::from_secs(30),
            write_with_response: Duration::from_secs(10),
        }
    }
}
