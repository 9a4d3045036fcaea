//! [`BleTransport`]: the one concrete [`crate::transport::Transport`] in
//! scope. Drives both the `btleplug`-backed central role
//! ([`super::central::CentralDriver`]) and the host-implemented
//! peripheral role ([`super::peripheral::BlePeripheralAdapter`]) through
//! the shared [`super::link::RadioLink`]/[`super::link::LinkEvent`]
//! boundary, applying one per-device pipeline regardless of which role
//! produced the link: rate limiting, the cold-boot rule, Noise
//! encrypt/decrypt, the source-id check, handshake timeout, and stale
//! eviction (spec.md §4.5).

use super::config::BleConfig;
use super::envelope;
use super::link::{LinkEvent, RadioLink};
use super::peripheral::BlePeripheralAdapter;
use super::rate::InboundRateLimiter;
use super::uuids::SERVICE_UUID;
use crate::identity::PeerId;
use crate::packet::{MessageType, Packet};
use crate::session::SessionManager;
use crate::transport::{PeerEvent, PeerEventKind, Transport, TransportError, STREAM_CAPACITY};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, Mutex};

/// Per-device bookkeeping the transport owns outside the session
/// manager: link handle, negotiated MTU, bound peer-id, and liveness
/// timestamps for the timeout/eviction sweeps.
struct DeviceState {
    link: Option<Arc<dyn RadioLink>>,
    peer_id: Option<PeerId>,
    signing_key: Option<[u8; 32]>,
    #[allow(dead_code)]
    mtu: Option<u16>,
    #[allow(dead_code)]
    connected_at: Instant,
    last_activity: Instant,
    handshake_started_at: Option<Instant>,
}

impl DeviceState {
    fn new(link: Option<Arc<dyn RadioLink>>) -> Self {
        let now = Instant::now();
        Self {
            link,
            peer_id: None,
            signing_key: None,
            mtu: None,
            connected_at: now,
            last_activity: now,
            handshake_started_at: Some(now),
        }
    }
}

/// Shared state behind `BleTransport`'s single `Arc`, so background
/// tasks (event loop, sweeps) hold the same handle external callers do
/// rather than needing a second reference-counted wrapper.
struct Inner {
    config: BleConfig,
    my_peer_id: PeerId,
    sessions: Arc<SessionManager>,
    peripheral: Arc<dyn BlePeripheralAdapter>,
    #[cfg(feature = "ble")]
    central: Mutex<Option<Arc<super::central::CentralDriver>>>,
    running: Arc<AtomicBool>,
    devices: Mutex<HashMap<String, DeviceState>>,
    rate: Mutex<InboundRateLimiter>,
    /// Mirrors each authenticated device's signing key, keyed by peer-id,
    /// for the synchronous [`Transport::remote_signing_key`] lookup mesh
    /// signature verification needs without an `async` trait method.
    signing_keys: std::sync::Mutex<HashMap<PeerId, [u8; 32]>>,
    packets_tx: broadcast::Sender<Packet>,
    peers_tx: broadcast::Sender<PeerEvent>,
}

#[derive(Clone)]
pub struct BleTransport(Arc<Inner>);

impl BleTransport {
    pub fn new(
        config: BleConfig,
        my_peer_id: PeerId,
        sessions: Arc<SessionManager>,
        peripheral: Arc<dyn BlePeripheralAdapter>,
    ) -> Self {
        let (packets_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let (peers_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let rate = InboundRateLimiter::new(config.global_inbound_per_sec, config.per_peer_inbound_per_sec);
        Self(Arc::new(Inner {
            my_peer_id,
            sessions,
            peripheral,
            #[cfg(feature = "ble")]
            central: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            devices: Mutex::new(HashMap::new()),
            rate: Mutex::new(rate),
            signing_keys: std::sync::Mutex::new(HashMap::new()),
            packets_tx,
            peers_tx,
            config,
        }))
    }
}

impl Inner {
    async fn rate_limit_key(&self, device_id: &str) -> String {
        let devices = self.devices.lock().await;
        match devices.get(device_id).and_then(|d| d.peer_id) {
            Some(peer_id) => peer_id.to_hex(),
            None => device_id.to_string(),
        }
    }

    /// Drive one inbound radio event through the pipeline. Called from
    /// the merged central+peripheral event loop spawned by `start`.
    async fn handle_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Connected { device_id, link } => self.handle_connected(&device_id, link).await,
            LinkEvent::Disconnected { device_id } => self.cleanup_device(&device_id).await,
            LinkEvent::Data { device_id, bytes } => self.handle_inbound_bytes(&device_id, &bytes).await,
        }
    }

    /// Record a freshly-established central-role link so outbound writes
    /// to this device go out over the real GATT characteristic instead of
    /// falling through to our own peripheral-role notify path (spec.md
    /// §4.5 "negotiate MTU 512 ... cache per device; warn below 256").
    async fn handle_connected(&self, device_id: &str, link: Arc<dyn RadioLink>) {
        let mtu = link.mtu();
        if let Some(mtu) = mtu {
            if mtu < 256 {
                warn!("{device_id} negotiated MTU {mtu} is below the 256-byte floor");
            }
        }
        let mut devices = self.devices.lock().await;
        let state = devices.entry(device_id.to_string()).or_insert_with(|| DeviceState::new(None));
        state.link = Some(link);
        state.mtu = mtu;
    }

    async fn handle_inbound_bytes(&self, device_id: &str, bytes: &[u8]) {
        let now = Instant::now();
        let rate_key = self.rate_limit_key(device_id).await;
        {
            let mut rate = self.rate.lock().await;
            if !rate.allow(&rate_key, now) {
                debug!("dropping inbound frame from {device_id}: rate limited");
                return;
            }
        }

        let Some(envelope) = Packet::decode(bytes) else {
            debug!("dropping malformed envelope from {device_id}");
            return;
        };

        {
            let mut devices = self.devices.lock().await;
            devices.entry(device_id.to_string()).or_insert_with(|| DeviceState::new(None)).last_activity = now;
        }

        match envelope.msg_type {
            MessageType::Handshake => self.handle_handshake_envelope(device_id, envelope).await,
            MessageType::NoiseEncrypted => self.handle_noise_envelope(device_id, envelope).await,
            _ => {
                // Cold-boot rule: only a handshake may cross a link with
                // no established session; everything else not wrapped in
                // NoiseEncrypted is dropped outright (spec.md §4.5).
                debug!("dropping non-handshake, non-wrapped envelope from {device_id}");
            }
        }
    }

    async fn handle_handshake_envelope(&self, device_id: &str, envelope: Packet) {
        match self.sessions.process(device_id, &envelope.payload).await {
            Ok(Some(reply_bytes)) => {
                if let Ok(reply_envelope) = envelope::wrap_handshake(self.my_peer_id, reply_bytes) {
                    if let Ok(encoded) = reply_envelope.encode() {
                        self.write_to_device(device_id, &encoded, true).await;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!("handshake with {device_id} failed: {e}");
                return;
            }
        }

        if self.sessions.is_established(device_id).await {
            self.finish_handshake(device_id, &envelope).await;
        }
    }

    async fn finish_handshake(&self, device_id: &str, envelope: &Packet) {
        let Some(remote_static) = self.sessions.remote_static_key(device_id).await else { return };
        let suite_peer_id = PeerId::from_static_public(self.sessions.suite(), &remote_static);

        // The handshake envelope's own claimed source_id must agree with
        // the cryptographically derived identity — refuse to bind a
        // peer-id we didn't actually authenticate.
        if envelope.source_id != suite_peer_id {
            warn!("handshake source-id mismatch for {device_id}; disposing session");
            self.sessions.dispose(device_id).await;
            return;
        }

        let signing_key = self.sessions.remote_signing_key(device_id).await;

        let mut devices = self.devices.lock().await;
        let state = devices.entry(device_id.to_string()).or_insert_with(|| DeviceState::new(None));
        state.peer_id = Some(suite_peer_id);
        state.signing_key = signing_key;
        state.handshake_started_at = None;
        drop(devices);

        if let Some(key) = signing_key {
            self.signing_keys.lock().expect("poisoned").insert(suite_peer_id, key);
        }

        let _ = self.peers_tx.send(PeerEvent {
            device_id: device_id.to_string(),
            peer_id: Some(suite_peer_id),
            kind: PeerEventKind::Authenticated,
        });
    }

    async fn handle_noise_envelope(&self, device_id: &str, envelope: Packet) {
        let bound_peer_id = {
            let devices = self.devices.lock().await;
            devices.get(device_id).and_then(|d| d.peer_id)
        };
        let Some(bound_peer_id) = bound_peer_id else {
            debug!("dropping NoiseEncrypted frame from unauthenticated {device_id}");
            return;
        };
        if envelope.source_id != bound_peer_id {
            warn!("source-id mismatch on link {device_id}; dropping");
            return;
        }

        let Some(plaintext) = self.sessions.decrypt(device_id, &envelope.payload).await else {
            debug!("dropping undecryptable NoiseEncrypted frame from {device_id}");
            return;
        };
        let Some(inner) = Packet::decode(&plaintext) else {
            debug!("dropping malformed inner packet from {device_id}");
            return;
        };
        if inner.source_id == self.my_peer_id {
            return;
        }
        let _ = self.packets_tx.send(inner);
    }

    async fn cleanup_device(&self, device_id: &str) {
        self.sessions.dispose(device_id).await;
        let removed = self.devices.lock().await.remove(device_id);
        if let Some(state) = removed {
            if let Some(peer_id) = state.peer_id {
                self.signing_keys.lock().expect("poisoned").remove(&peer_id);
            }
            let _ = self.peers_tx.send(PeerEvent {
                device_id: device_id.to_string(),
                peer_id: state.peer_id,
                kind: PeerEventKind::Disconnected,
            });
        }
    }

    async fn write_to_device(&self, device_id: &str, bytes: &[u8], with_response: bool) {
        let link = self.devices.lock().await.get(device_id).and_then(|d| d.link.clone());
        if let Some(link) = link {
            if let Err(e) = link.write(bytes, with_response).await {
                warn!("write to {device_id} failed: {e}");
            }
        } else if let Err(e) = self.peripheral.notify(device_id, bytes).await {
            warn!("notify to {device_id} failed: {e}");
        }
    }

    /// Sweep loop: disconnect peripheral clients whose handshake hasn't
    /// completed within `handshake_timeout`, and evict authenticated
    /// clients silent for `stale_after` (spec.md §4.5).
    async fn run_sweeps(&self) {
        let mut handshake_tick = tokio::time::interval(self.config.handshake_timeout_check_interval);
        let mut stale_tick = tokio::time::interval(self.config.stale_check_interval);
        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = handshake_tick.tick() => self.sweep_handshake_timeouts().await,
                _ = stale_tick.tick() => self.sweep_stale_clients().await,
            }
        }
    }

    async fn sweep_handshake_timeouts(&self) {
        let now = Instant::now();
        let timed_out: Vec<String> = {
            let devices = self.devices.lock().await;
            devices
                .iter()
                .filter_map(|(id, s)| {
                    s.handshake_started_at
                        .filter(|t| now.duration_since(*t) > self.config.handshake_timeout)
                        .map(|_| id.clone())
                })
                .collect()
        };
        for device_id in timed_out {
            debug!("handshake timeout for {device_id}");
            let _ = self.peripheral.disconnect(&device_id).await;
            self.cleanup_device(&device_id).await;
        }
    }

    async fn sweep_stale_clients(&self) {
        let now = Instant::now();
        let stale: Vec<String> = {
            let devices = self.devices.lock().await;
            devices
                .iter()
                .filter(|(_, s)| s.peer_id.is_some())
                .filter_map(|(id, s)| (now.duration_since(s.last_activity) > self.config.stale_after).then(|| id.clone()))
                .collect()
        };
        for device_id in stale {
            debug!("evicting stale authenticated client {device_id}");
            let _ = self.peripheral.disconnect(&device_id).await;
            self.cleanup_device(&device_id).await;
        }
    }
}

async fn forward_peripheral_events(mut from: mpsc::Receiver<LinkEvent>, to: mpsc::Sender<LinkEvent>) {
    while let Some(event) = from.recv().await {
        if to.send(event).await.is_err() {
            break;
        }
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let inner = self.0.clone();
        if inner.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (events_tx, mut events_rx) = mpsc::channel::<LinkEvent>(STREAM_CAPACITY);
        let peripheral_events = inner.peripheral.take_event_receiver();

        if let Err(e) = inner.peripheral.start_advertising(*SERVICE_UUID).await {
            inner.running.store(false, Ordering::SeqCst);
            return Err(TransportError::Radio(e.to_string()));
        }

        #[cfg(feature = "ble")]
        {
            match super::central::CentralDriver::new(inner.config.clone(), inner.running.clone()).await {
                Ok(driver) => {
                    let driver = Arc::new(driver);
                    *inner.central.lock().await = Some(driver.clone());
                    let tx = events_tx.clone();
                    tokio::spawn(async move {
                        let _ = driver.run(tx).await;
                    });
                }
                Err(e) => {
                    let _ = inner.peripheral.stop_advertising().await;
                    inner.running.store(false, Ordering::SeqCst);
                    return Err(TransportError::Radio(e.to_string()));
                }
            }
        }

        // Forward the peripheral adapter's events into the same merged
        // channel the processing loop below consumes, so central- and
        // peripheral-role links run through one pipeline.
        tokio::spawn(forward_peripheral_events(peripheral_events, events_tx));

        let processing = inner.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if !processing.running.load(Ordering::SeqCst) {
                    break;
                }
                processing.handle_event(event).await;
            }
        });

        let sweeping = inner.clone();
        tokio::spawn(async move {
            sweeping.run_sweeps().await;
        });

        Ok(())
    }

    async fn stop(&self) {
        let inner = &self.0;
        if !inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = inner.peripheral.stop_advertising().await;
        let device_ids: Vec<String> = inner.devices.lock().await.keys().cloned().collect();
        for device_id in device_ids {
            inner.cleanup_device(&device_id).await;
        }
    }

    async fn send_packet(&self, packet: &Packet, to: PeerId) -> Result<(), TransportError> {
        let inner = &self.0;
        let device_id = {
            let devices = inner.devices.lock().await;
            devices.iter().find(|(_, s)| s.peer_id == Some(to)).map(|(id, _)| id.clone())
        };
        let Some(device_id) = device_id else { return Err(TransportError::NoSession) };

        let encoded = packet.encode().map_err(|e| TransportError::Radio(e.to_string()))?;
        let frame = inner.sessions.encrypt(&device_id, &encoded).await.ok_or(TransportError::NoSession)?;
        let envelope = envelope::wrap_noise_frame(inner.my_peer_id, to, frame)
            .map_err(|e| TransportError::Radio(e.to_string()))?;
        let bytes = envelope.encode().map_err(|e| TransportError::Radio(e.to_string()))?;

        let with_response = matches!(packet.msg_type, MessageType::Handshake | MessageType::EmergencyAlert);
        inner.write_to_device(&device_id, &bytes, with_response).await;
        Ok(())
    }

    async fn broadcast_packet(&self, packet: &Packet) -> Result<(), TransportError> {
        let inner = &self.0;
        let targets: Vec<(String, PeerId)> = {
            let devices = inner.devices.lock().await;
            devices.iter().filter_map(|(id, s)| s.peer_id.map(|p| (id.clone(), p))).collect()
        };
        let encoded = packet.encode().map_err(|e| TransportError::Radio(e.to_string()))?;
        let with_response = matches!(packet.msg_type, MessageType::Handshake | MessageType::EmergencyAlert);

        for (device_id, peer_id) in targets {
            let Some(frame) = inner.sessions.encrypt(&device_id, &encoded).await else { continue };
            let Ok(envelope) = envelope::wrap_noise_frame(inner.my_peer_id, peer_id, frame) else { continue };
            let Ok(bytes) = envelope.encode() else { continue };
            inner.write_to_device(&device_id, &bytes, with_response).await;
        }
        Ok(())
    }

    fn packets(&self) -> broadcast::Receiver<Packet> {
        self.0.packets_tx.subscribe()
    }

    fn peers(&self) -> broadcast::Receiver<PeerEvent> {
        self.0.peers_tx.subscribe()
    }

    fn my_peer_id(&self) -> PeerId {
        self.0.my_peer_id
    }

    fn remote_signing_key(&self, peer: PeerId) -> Option<[u8; 32]> {
        self.0.signing_keys.lock().expect("poisoned").get(&peer).copied()
    }
}
