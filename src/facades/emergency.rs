//! Emergency facade (spec.md §4.7, §7). Two distinct retry mechanisms
//! apply here and only here:
//!
//! - **Retransmission for reach**: every broadcast attempt rebuilds the
//!   packet from scratch (fresh timestamp, fresh CSPRNG `flags` byte) so
//!   each retransmission carries its own dedup id and isn't collapsed by
//!   the mesh deduplicator. Fixed 3 attempts, randomized 400-600 ms
//!   spacing (spec.md §4.7).
//! - **Resource-error backoff**: if any single attempt's
//!   `broadcast_packet` call itself fails (no session / radio error),
//!   that one attempt is retried with exponential backoff (500 ms *
//!   2^(n-1), bounded to 5 tries) before moving on to the next scheduled
//!   retransmission (spec.md §7 "Resource ... emergency does so
//!   explicitly").

use super::{FacadeError, Result, DEFAULT_BROADCAST_TTL};
use crate::identity::PeerId;
use crate::packet::{MessageType, Packet};
use crate::transport::{Transport, TransportError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const RETRANSMIT_ATTEMPTS: u32 = 3;
const RETRANSMIT_SPACING_MIN_MS: u64 = 400;
const RETRANSMIT_SPACING_MAX_MS: u64 = 600;
const MAX_BACKOFF_ATTEMPTS: u32 = 5;
const BACKOFF_BASE_MS: u64 = 500;

#[derive(Clone, Debug, PartialEq)]
pub struct EmergencyAlert {
    pub message: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl EmergencyAlert {
    pub fn encode(&self) -> Vec<u8> {
        #[derive(serde::Serialize)]
        struct Wire<'a> {
            m: &'a str,
            lat: Option<f64>,
            lon: Option<f64>,
        }
        bincode::serialize(&Wire { m: &self.message, lat: self.lat, lon: self.lon })
            .expect("emergency alert serialization never fails")
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        #[derive(serde::Deserialize)]
        struct Wire {
            m: String,
            lat: Option<f64>,
            lon: Option<f64>,
        }
        let wire: Wire = bincode::deserialize(bytes).ok()?;
        if wire.lat.is_some_and(|v| !v.is_finite()) || wire.lon.is_some_and(|v| !v.is_finite()) {
            return None;
        }
        Some(Self { message: wire.m, lat: wire.lat, lon: wire.lon })
    }
}

#[derive(Clone, Debug)]
pub struct EmergencyEvent {
    pub from: PeerId,
    pub alert: EmergencyAlert,
}

pub struct EmergencyFacade {
    transport: Arc<dyn Transport>,
    events_tx: broadcast::Sender<EmergencyEvent>,
}

impl EmergencyFacade {
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
                    Ok(packet) if packet.msg_type == MessageType::EmergencyAlert => {
                        if let Some(alert) = EmergencyAlert::decode(&packet.payload) {
                            let _ = tx.send(EmergencyEvent { from: packet.source_id, alert });
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        log::warn!("emergency facade inbound stream lagged, some packets dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Broadcast `alert` with the spec's fixed 3-attempt, jittered-spacing
    /// retransmission scheme. Each attempt is itself retried on transient
    /// resource errors with bounded exponential backoff. Returns the
    /// number of attempts that the transport accepted (0 means every
    /// attempt exhausted its backoff budget and failed).
    pub async fn broadcast(&self, alert: &EmergencyAlert) -> Result<u32> {
        let payload = alert.encode();
        let mut accepted = 0u32;
        for attempt in 0..RETRANSMIT_ATTEMPTS {
            match self.send_one_with_backoff(&payload).await {
                Ok(()) => accepted += 1,
                Err(e) => log::warn!("emergency broadcast attempt {attempt} exhausted backoff: {e}"),
            }
            if attempt + 1 < RETRANSMIT_ATTEMPTS {
                let spacing = rand::thread_rng().gen_range(RETRANSMIT_SPACING_MIN_MS..=RETRANSMIT_SPACING_MAX_MS);
                tokio::time::sleep(Duration::from_millis(spacing)).await;
            }
        }
        if accepted == 0 {
            return Err(FacadeError::Transport(TransportError::Radio("all emergency retransmissions failed".into())));
        }
        Ok(accepted)
    }

    async fn send_one_with_backoff(&self, payload: &[u8]) -> std::result::Result<(), TransportError> {
        for attempt in 1..=MAX_BACKOFF_ATTEMPTS {
            let packet = Packet::new(
                MessageType::EmergencyAlert,
                DEFAULT_BROADCAST_TTL,
                self.transport.my_peer_id(),
                PeerId::BROADCAST,
                payload.to_vec(),
            )
            .map_err(|e| TransportError::Radio(e.to_string()))?;

            match self.transport.broadcast_packet(&packet).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt == MAX_BACKOFF_ATTEMPTS => return Err(e),
                Err(_) => {
                    let delay_ms = BACKOFF_BASE_MS * (1u64 << (attempt - 1));
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
        unreachable!("loop always returns by the final attempt")
    }

    pub fn events(&self) -> broadcast::Receiver<EmergencyEvent> {
        self.events_tx.subscribe()
    }
}

impl super::Facade for EmergencyFacade {
    type Event = EmergencyEvent;

    fn inbound_stream(&self) -> broadcast::Receiver<EmergencyEvent> {
        self.events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_round_trips() {
        let alert = EmergencyAlert { message: "help".into(), lat: Some(1.0), lon: Some(2.0) };
        let decoded = EmergencyAlert::decode(&alert.encode()).unwrap();
        assert_eq!(decoded, alert);
    }

    #[test]
    fn alert_without_location_round_trips() {
        let alert = EmergencyAlert { message: "help".into(), lat: None, lon: None };
        let decoded = EmergencyAlert::decode(&alert.encode()).unwrap();
        assert_eq!(decoded, alert);
    }

    #[test]
    fn nan_coordinates_rejected_on_decode() {
        let mut alert = EmergencyAlert { message: "help".into(), lat: Some(f64::NAN), lon: None };
        // Bypass `new`-style validation (there is none here) by encoding
        // directly -- decode must still reject it.
        let bytes = alert.encode();
        assert!(EmergencyAlert::decode(&bytes).is_none());
        alert.lat = Some(1.0);
        assert!(EmergencyAlert::decode(&alert.encode()).is_some());
    }
}
