//! Location facade (spec.md §4.7, §8 "NaN / ±∞ lat/lon ... return none
//! from decode"). Payload is a fixed binary record, consistent with the
//! rest of the crate's wire layouts rather than a JSON blob.

use super::{broadcast_payload, FacadeError, Result, DEFAULT_BROADCAST_TTL};
use crate::identity::PeerId;
use crate::packet::MessageType;
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const LOCATION_PAYLOAD_LEN: usize = 8 + 8 + 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lon: f64,
    pub timestamp_ms: i64,
}

impl LocationUpdate {
    /// `None` if `lat`/`lon` are not finite (NaN or ±infinity) or out of
    /// the valid geographic range.
    pub fn new(lat: f64, lon: f64, timestamp_ms: i64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon, timestamp_ms })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LOCATION_PAYLOAD_LEN);
        buf.extend_from_slice(&self.lat.to_be_bytes());
        buf.extend_from_slice(&self.lon.to_be_bytes());
        buf.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != LOCATION_PAYLOAD_LEN {
            return None;
        }
        let lat = f64::from_be_bytes(bytes[0..8].try_into().ok()?);
        let lon = f64::from_be_bytes(bytes[8..16].try_into().ok()?);
        let timestamp_ms = i64::from_be_bytes(bytes[16..24].try_into().ok()?);
        Self::new(lat, lon, timestamp_ms)
    }
}

#[derive(Clone, Debug)]
pub struct LocationEvent {
    pub from: PeerId,
    pub update: LocationUpdate,
}

pub struct LocationFacade {
    transport: Arc<dyn Transport>,
    events_tx: broadcast::Sender<LocationEvent>,
}

impl LocationFacade {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (events_tx, _) = broadcast::channel(crate::transport::STREAM_CAPACITY);
        let facade = Self { transport, events_tx };
        facade.spawn_inbound_forwarder();
        facade
    }

    fn spawn_inbound_forwarder(&self) {
        let mut packets = self.transport.packets();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            loop {
                match packets.recv().await {
                    Ok(packet) if packet.msg_type == MessageType::LocationUpdate => {
                        if let Some(update) = LocationUpdate::decode(&packet.payload) {
                            let _ = tx.send(LocationEvent { from: packet.source_id, update });
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        log::warn!("location facade inbound stream lagged, some packets dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub async fn broadcast(&self, update: LocationUpdate) -> Result<()> {
        broadcast_payload(&self.transport, MessageType::LocationUpdate, DEFAULT_BROADCAST_TTL, update.encode()).await
    }

    pub async fn broadcast_group_encrypted(&self, group: &crate::group::GroupManager, update: LocationUpdate) -> Result<()> {
        let ciphertext = group
            .encrypt_for_group(&update.encode(), MessageType::LocationUpdate.as_u8())
            .await
            .ok_or(FacadeError::NoActiveGroup)?;
        broadcast_payload(&self.transport, MessageType::LocationUpdate, DEFAULT_BROADCAST_TTL, ciphertext).await
    }

    pub fn events(&self) -> broadcast::Receiver<LocationEvent> {
        self.events_tx.subscribe()
    }
}

impl super::Facade for LocationFacade {
    type Event = LocationEvent;

    fn inbound_stream(&self) -> broadcast::Receiver<LocationEvent> {
        self.events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_coordinates_round_trip() {
        let u = LocationUpdate::new(37.7749, -122.4194, 12345).unwrap();
        let decoded = LocationUpdate::decode(&u.encode()).unwrap();
        assert_eq!(decoded, u);
    }

    #[test]
    fn nan_lat_is_rejected() {
        assert!(LocationUpdate::new(f64::NAN, 0.0, 0).is_none());
    }

    #[test]
    fn infinite_lon_is_rejected() {
        assert!(LocationUpdate::new(0.0, f64::INFINITY, 0).is_none());
        assert!(LocationUpdate::new(0.0, f64::NEG_INFINITY, 0).is_none());
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(LocationUpdate::new(91.0, 0.0, 0).is_none());
        assert!(LocationUpdate::new(0.0, 181.0, 0).is_none());
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(LocationUpdate::decode(&[0u8; 10]).is_none());
    }
}
