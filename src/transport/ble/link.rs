//! One active GATT link to a remote device, abstracted over whether it
//! came from our central role (we scanned, connected, and subscribed) or
//! our peripheral role (a remote central connected to us). Everything
//! above this point — handshake bootstrapping, Noise encrypt/decrypt,
//! rate limiting, stale-client eviction — is identical for both, so
//! [`super::transport::BleTransport`] drives a `RadioLink` rather than
//! branching on role.

use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// We are the GATT client: we scanned, connected, discovered the
    /// service, and subscribed to notifications.
    Central,
    /// We are the GATT server: a remote central connected to us and
    /// wrote to our characteristic.
    Peripheral,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("radio write failed: {0}")]
    Write(String),
    #[error("link is closed")]
    Closed,
}

/// One established GATT connection, written through by
/// [`super::transport::BleTransport`]. Implementations own the
/// underlying `btleplug` `Peripheral` handle (central role) or a handle
/// into a [`super::peripheral::BlePeripheralAdapter`] connection
/// (peripheral role).
#[async_trait]
pub trait RadioLink: Send + Sync {
    fn device_id(&self) -> &str;
    fn role(&self) -> LinkRole;

    /// Write one encoded packet. `with_response` selects
    /// write-with-response (handshake and emergency traffic, per
    /// spec.md §4.5) vs write-without-response (everything else).
    async fn write(&self, data: &[u8], with_response: bool) -> Result<(), LinkError>;

    /// Negotiated MTU for this link, if known (central role only —
    /// MTU negotiation is a central-initiated GATT operation).
    fn mtu(&self) -> Option<u16> {
        None
    }
}

/// Inbound events produced by a link: a fresh connection handle, decoded
/// bytes for the transport to feed into the per-device pipeline, or a
/// disconnect notice.
pub enum LinkEvent {
    /// A new link is available for writing to `device_id`. Sent once, at
    /// connect time, by the role that established the link (only the
    /// central role needs this — a peripheral-role connection is written
    /// back to through [`super::peripheral::BlePeripheralAdapter::notify`]
    /// instead, since the remote central holds the real GATT handle).
    Connected { device_id: String, link: std::sync::Arc<dyn RadioLink> },
    Data { device_id: String, bytes: Vec<u8> },
    Disconnected { device_id: String },
}

pub type LinkEventSender = mpsc::Sender<LinkEvent>;
pub type LinkEventReceiver = mpsc::Receiver<LinkEvent>;

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// An in-memory `RadioLink` pair for unit tests that exercise
    /// [`super::super::transport::BleTransport`]'s pipeline without real
    /// BLE hardware: writes on one end arrive as [`LinkEvent::Data`] on
    /// the other end's event channel.
    pub struct LoopbackLink {
        device_id: String,
        role: LinkRole,
        peer_events: LinkEventSender,
        peer_device_id: String,
        written: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl LoopbackLink {
        pub fn new(
            device_id: impl Into<String>,
            role: LinkRole,
            peer_device_id: impl Into<String>,
            peer_events: LinkEventSender,
        ) -> Self {
            Self {
                device_id: device_id.into(),
                role,
                peer_events,
                peer_device_id: peer_device_id.into(),
                written: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub async fn written_frames(&self) -> Vec<Vec<u8>> {
            self.written.lock().await.clone()
        }
    }

    #[async_trait]
    impl RadioLink for LoopbackLink {
        fn device_id(&self) -> &str {
            &self.device_id
        }

        fn role(&self) -> LinkRole {
            self.role
        }

        async fn write(&self, data: &[u8], _with_response: bool) -> Result<(), LinkError> {
            self.written.lock().await.push(data.to_vec());
            self.peer_events
                .send(LinkEvent::Data { device_id: self.peer_device_id.clone(), bytes: data.to_vec() })
                .await
                .map_err(|e| LinkError::Write(e.to_string()))
        }

        fn mtu(&self) -> Option<u16> {
            Some(512)
        }
    }
}
