//! Peripheral (GATT server) role.
//!
//! No Rust BLE crate — including `btleplug`, the central/client library
//! this module's sibling [`super::central`] is built on — implements the
//! peripheral/server side of GATT on any platform: advertising and
//! accepting writes is always a native platform API (`CBPeripheralManager`
//! on iOS/macOS, `BluetoothGattServer` on Android, BlueZ's
//! `GattManager1` over D-Bus on Linux). That is exactly the kind of
//! platform-glue boundary spec.md §1 places outside the core ("platform
//! permission prompts" and friends) — so, the same way [`crate::storage`]
//! defines `SecureKvStore` for the host to implement over its real
//! keystore, this module defines [`BlePeripheralAdapter`] for the host to
//! implement over its real GATT server. [`super::transport::BleTransport`]
//! drives both the `btleplug`-backed central role and this adapter
//! through the same [`super::link::RadioLink`] abstraction, so neither
//! role gets special-cased logic above the radio boundary.

use super::link::{LinkEventReceiver, LinkEventSender};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    #[error("advertising failed: {0}")]
    Advertise(String),
    #[error("notify failed: {0}")]
    Notify(String),
    #[error("no such connected client: {0}")]
    NoSuchClient(String),
}

/// Implemented by the host over its platform's GATT server. All
/// operations are keyed by an opaque `device_id` the adapter assigns
/// when a remote central connects (spec.md §4.4 "opaque device-id string
/// (radio-layer identity)").
#[async_trait]
pub trait BlePeripheralAdapter: Send + Sync {
    /// Begin advertising `service_uuid` only — no local name, no
    /// manufacturer data (spec.md §4.5).
    async fn start_advertising(&self, service_uuid: Uuid) -> Result<(), PeripheralError>;
    async fn stop_advertising(&self) -> Result<(), PeripheralError>;

    /// Write-with-response or write-without-response a packet to a
    /// connected client via notification on the packet characteristic.
    async fn notify(&self, device_id: &str, data: &[u8]) -> Result<(), PeripheralError>;

    /// Forcibly disconnect a client (handshake timeout, stale eviction).
    async fn disconnect(&self, device_id: &str) -> Result<(), PeripheralError>;

    /// Register the channel the adapter pushes connect/write/disconnect
    /// events onto, translated into [`super::link::LinkEvent`]s plus an
    /// initial connect notice the transport turns into a fresh
    /// [`super::link::RadioLink`].
    fn take_event_receiver(&self) -> LinkEventReceiver;
}

/// A minimal in-process `BlePeripheralAdapter` for tests and for hosts
/// with no real radio (e.g. integration tests that run the whole mesh
/// pipeline over loopback links). Connections are injected by calling
/// [`MemoryPeripheralAdapter::connect_client`] directly rather than by a
/// real remote central.
pub struct MemoryPeripheralAdapter {
    events_tx: LinkEventSender,
    events_rx: std::sync::Mutex<Option<LinkEventReceiver>>,
    clients: tokio::sync::Mutex<std::collections::HashMap<String, super::link::LinkEventSender>>,
}

impl MemoryPeripheralAdapter {
    pub fn new() -> Self {
        let (tx, rx) = tokio::sync::mpsc::channel(256);
        Self {
            events_tx: tx,
            events_rx: std::sync::Mutex::new(Some(rx)),
            clients: tokio::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Simulate a remote central connecting and writing `initial_bytes`
    /// (typically Noise message 1).
    pub async fn connect_client(&self, device_id: &str, initial_bytes: Vec<u8>) {
        let mut clients = self.clients.lock().await;
        clients.insert(device_id.to_string(), self.events_tx.clone());
        drop(clients);
        let _ = self
            .events_tx
            .send(super::link::LinkEvent::Data { device_id: device_id.to_string(), bytes: initial_bytes })
            .await;
    }
}

impl Default for MemoryPeripheralAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlePeripheralAdapter for MemoryPeripheralAdapter {
    async fn start_advertising(&self, _service_uuid: Uuid) -> Result<(), PeripheralError> {
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<(), PeripheralError> {
        Ok(())
    }

    async fn notify(&self, device_id: &str, _data: &[u8]) -> Result<(), PeripheralError> {
        let clients = self.clients.lock().await;
        if clients.contains_key(device_id) {
            Ok(())
        } else {
            Err(PeripheralError::NoSuchClient(device_id.to_string()))
        }
    }

    async fn disconnect(&self, device_id: &str) -> Result<(), PeripheralError> {
        let mut clients = self.clients.lock().await;
        clients.remove(device_id);
        Ok(())
    }

    fn take_event_receiver(&self) -> LinkEventReceiver {
        self.events_rx.lock().expect("poisoned").take().expect("event receiver already taken")
    }
}
