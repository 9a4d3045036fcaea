//! Central (GATT client) role: duty-cycled scanning, connecting,
//! per-device MTU negotiation, and notification subscription, built on
//! `btleplug` (the GATT central/peripheral crate picked from the
//! retrieval pack's `happybigmtn-bitchat-rust` manifest for this exact
//! domain — see SPEC_FULL.md §4.5).

use super::config::{BleConfig, IoTimeouts};
use super::link::{LinkEvent, LinkEventSender, LinkRole, RadioLink};
use super::uuids::{PACKET_CHARACTERISTIC_UUID, SERVICE_UUID};
use async_trait::async_trait;
use btleplug::api::{
    Central as _, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::timeout;

#[derive(Error, Debug)]
pub enum CentralError {
    #[error("adapter error: {0}")]
    Adapter(String),
    #[error("no Bluetooth adapter available")]
    NoAdapter,
}

/// One `btleplug`-backed link to a remote peripheral we initiated.
pub struct BtleplugLink {
    device_id: String,
    peripheral: Peripheral,
    characteristic: Characteristic,
    mtu: u16,
}

#[async_trait]
impl RadioLink for BtleplugLink {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn role(&self) -> LinkRole {
        LinkRole::Central
    }

    async fn write(&self, data: &[u8], with_response: bool) -> Result<(), super::link::LinkError> {
        let write_type = if with_response { WriteType::WithResponse } else { WriteType::WithoutResponse };
        let timeouts = IoTimeouts::default();
        timeout(timeouts.write_with_response, self.peripheral.write(&self.characteristic, data, write_type))
            .await
            .map_err(|_| super::link::LinkError::Write("write timed out".into()))?
            .map_err(|e| super::link::LinkError::Write(e.to_string()))
    }

    fn mtu(&self) -> Option<u16> {
        Some(self.mtu)
    }
}

/// Runs the scan/connect/subscribe loop until `running` is cleared.
/// Every discovered device advertising [`SERVICE_UUID`] is connected to,
/// has its packet characteristic subscribed, and gets a [`LinkEvent`] of
/// its first inbound notification routed to `events`; the caller (the
/// mesh transport) drives the per-device Noise/session pipeline from
/// there exactly as it would for a peripheral-role link.
pub struct CentralDriver {
    adapter: Adapter,
    config: BleConfig,
    running: Arc<AtomicBool>,
}

impl CentralDriver {
    pub async fn new(config: BleConfig, running: Arc<AtomicBool>) -> Result<Self, CentralError> {
        let manager = Manager::new().await.map_err(|e| CentralError::Adapter(e.to_string()))?;
        let adapters = manager.adapters().await.map_err(|e| CentralError::Adapter(e.to_string()))?;
        let adapter = adapters.into_iter().next().ok_or(CentralError::NoAdapter)?;
        Ok(Self { adapter, config, running })
    }

    /// Duty-cycle scan: active window, then a pause that overlaps its
    /// tail so there's no blind gap, repeating until `running` clears.
    /// After `idle_after` with no send/receive activity the caller may
    /// stop calling this loop entirely (idle mode); any send/receive
    /// resumes it (spec.md §4.5).
    pub async fn run(&self, events: LinkEventSender) -> Result<(), CentralError> {
        let mut already_linked: HashSet<String> = HashSet::new();

        while self.running.load(Ordering::SeqCst) {
            self.adapter
                .start_scan(ScanFilter { services: vec![*SERVICE_UUID] })
                .await
                .map_err(|e| CentralError::Adapter(e.to_string()))?;

            let scan_deadline = tokio::time::Instant::now() + self.config.scan_active;
            let mut event_stream = self.adapter.events().await.map_err(|e| CentralError::Adapter(e.to_string()))?;

            while tokio::time::Instant::now() < scan_deadline && self.running.load(Ordering::SeqCst) {
                let remaining = scan_deadline.saturating_duration_since(tokio::time::Instant::now());
                match timeout(remaining, event_stream.next()).await {
                    Ok(Some(CentralEvent::DeviceDiscovered(id))) | Ok(Some(CentralEvent::DeviceUpdated(id))) => {
                        let device_id = format!("{id:?}");
                        if already_linked.contains(&device_id) {
                            continue;
                        }
                        if let Ok(Some((peripheral, characteristic, mtu))) = self.try_connect(&id).await {
                            already_linked.insert(device_id.clone());
                            let link = Arc::new(BtleplugLink {
                                device_id: device_id.clone(),
                                peripheral: peripheral.clone(),
                                characteristic: characteristic.clone(),
                                mtu,
                            });
                            if events.send(LinkEvent::Connected { device_id: device_id.clone(), link }).await.is_err() {
                                break;
                            }
                            self.spawn_notification_forwarder(device_id, (peripheral, characteristic, mtu), events.clone());
                        }
                    }
                    Ok(Some(CentralEvent::DeviceDisconnected(id))) => {
                        already_linked.remove(&format!("{id:?}"));
                        let _ = events.send(LinkEvent::Disconnected { device_id: format!("{id:?}") }).await;
                    }
                    _ => break,
                }
            }

            let _ = self.adapter.stop_scan().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.config.scan_pause).await;
        }
        Ok(())
    }

    async fn try_connect(
        &self,
        id: &btleplug::platform::PeripheralId,
    ) -> Result<Option<(Peripheral, Characteristic, u16)>, CentralError> {
        let peripheral = self.adapter.peripheral(id).await.map_err(|e| CentralError::Adapter(e.to_string()))?;
        let timeouts = IoTimeouts::default();
        match timeout(timeouts.adapter_on, peripheral.connect()).await {
            Ok(Ok(())) => {}
            _ => return Ok(None),
        }
        peripheral.discover_services().await.map_err(|e| CentralError::Adapter(e.to_string()))?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == *PACKET_CHARACTERISTIC_UUID);
        let Some(characteristic) = characteristic else {
            return Ok(None);
        };
        peripheral.subscribe(&characteristic).await.map_err(|e| CentralError::Adapter(e.to_string()))?;

        // `btleplug` has no portable MTU-request API; negotiation happens
        // inside each platform backend on connect. We record the
        // configured target and warn the caller separately if a given
        // backend reports a smaller effective value (spec.md §4.5 "warn
        // below 256") — tracked by `BleTransport` per-device MTU cache,
        // not here.
        let mtu = self.config.mtu_target;
        Ok(Some((peripheral, characteristic, mtu)))
    }

    fn spawn_notification_forwarder(
        &self,
        device_id: String,
        link: (Peripheral, Characteristic, u16),
        events: LinkEventSender,
    ) {
        let (peripheral, characteristic, _mtu) = link;
        let running = self.running.clone();
        tokio::spawn(async move {
            let Ok(mut notifications) = peripheral.notifications().await else { return };
            while running.load(Ordering::SeqCst) {
                match notifications.next().await {
                    Some(notification) if notification.uuid == characteristic.uuid => {
                        if events
                            .send(LinkEvent::Data { device_id: device_id.clone(), bytes: notification.value })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(_) => continue,
                    None => {
                        let _ = events.send(LinkEvent::Disconnected { device_id: device_id.clone() }).await;
                        break;
                    }
                }
            }
        });
    }

    /// Build the [`RadioLink`] handle used to *send* to a device already
    /// routed through [`Self::run`]. Kept separate from the forwarder
    /// task above because writes happen from `BleTransport::send_packet`,
    /// not from the scan loop.
    pub async fn link_for(&self, device_id: &str) -> Option<Arc<dyn RadioLink>> {
        for p in self.adapter.peripherals().await.ok()?.into_iter() {
            if format!("{:?}", p.id()) == device_id {
                let characteristic =
                    p.characteristics().into_iter().find(|c| c.uuid == *PACKET_CHARACTERISTIC_UUID)?;
                return Some(Arc::new(BtleplugLink {
                    device_id: device_id.to_string(),
                    peripheral: p,
                    characteristic,
                    mtu: self.config.mtu_target,
                }));
            }
        }
        None
    }

    pub async fn connection_count(&self) -> usize {
        self.adapter.peripherals().await.map(|peripherals| peripherals.len()).unwrap_or(0)
    }
}
