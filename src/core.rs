//! [`DriftmeshCore`]: process lifecycle wiring (spec.md §6 "Process
//! lifecycle"). Replaces the teacher's scattered Android/iOS FFI
//! bootstrap (`ffi/android.rs`, `ffi/ios.rs`) with one explicit
//! constructor a host calls once at startup, holding the handle down
//! through every layer instead of reaching for ambient globals (spec.md
//! §9 "long-lived globals").
//!
//! Startup order: initialize the crypto suite → load or generate
//! identity + signing keys → load the active group, if any → start the
//! transport → start the mesh service → hand the running
//! [`crate::mesh::MeshService`] to facades. Shutdown reverses this.
//! The concrete [`crate::transport::Transport`] (normally
//! [`crate::transport::ble::BleTransport`]) is constructed by the host
//! and passed in already wired to its platform-specific peripheral GATT
//! adapter — that adapter is the one piece of host glue this crate
//! cannot supply generically (spec.md §1 "thin adapters ... specified
//! only through the I/O contracts").

use crate::crypto::CryptoSuite;
use crate::facades::{chat::ChatFacade, emergency::EmergencyFacade, location::LocationFacade};
use crate::group::GroupManager;
use crate::identity::IdentityManager;
use crate::mesh::{MeshConfig, MeshService};
use crate::storage::SecureKvStore;
use crate::transport::{Transport, TransportError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("identity error: {0}")]
    Identity(#[from] crate::identity::IdentityError),
    #[error("group error: {0}")]
    Group(#[from] crate::group::GroupError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Owns every long-lived layer of the core and the three application
/// facades built on top of it. One instance per running device.
pub struct DriftmeshCore {
    pub identity: Arc<IdentityManager>,
    pub group: Arc<GroupManager>,
    pub mesh: MeshService,
    pub chat: ChatFacade,
    pub location: LocationFacade,
    pub emergency: EmergencyFacade,
}

impl DriftmeshCore {
    /// Brings up identity, group, and mesh state over an already
    /// constructed (but not yet started) `transport`, then starts the
    /// mesh service and the three facades. Returns only once the mesh
    /// service's own `start()` has returned, so a caller awaiting this
    /// function knows the device is ready to send and receive.
    pub async fn start(
        store: Arc<dyn SecureKvStore>,
        transport: Arc<dyn Transport>,
        mesh_config: MeshConfig,
    ) -> Result<Self, CoreError> {
        let suite = CryptoSuite::new();
        let identity = Arc::new(IdentityManager::initialize(suite, store.clone()).await?);
        let group = Arc::new(GroupManager::initialize(suite, store).await?);

        let mesh = MeshService::new(transport, identity.clone(), suite, mesh_config);
        mesh.start().await?;

        let mesh_transport: Arc<dyn Transport> = Arc::new(mesh.clone());
        let chat = ChatFacade::with_group(mesh_transport.clone(), Some(group.clone()));
        let location = LocationFacade::new(mesh_transport.clone());
        let emergency = EmergencyFacade::new(mesh_transport);

        Ok(Self { identity, group, mesh, chat, location, emergency })
    }

    /// Reverse of `start`: stop the mesh service (which in turn stops the
    /// underlying transport), awaited so every background task has
    /// observed the `running` flag flip before this returns.
    pub async fn shutdown(&self) {
        self.mesh.stop().await;
    }
}
