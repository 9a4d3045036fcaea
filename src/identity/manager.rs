//! [`IdentityManager`]: persistent static + signing keypairs and the
//! trusted-peer set, loaded from / saved to a [`SecureKvStore`].
//!
//! Mutation paths (`trust_peer`, `untrust_peer`, `reset_identity`)
//! serialize through an exclusive `tokio::sync::RwLock` write guard
//! (spec.md §5 "Mutation paths ... MUST serialize with an exclusive lock
//! over the specific store").

use super::keypair::{SigningKeypair, StaticKeypair};
use super::peer_id::PeerId;
use super::trust::TrustedPeerSet;
use crate::crypto::CryptoSuite;
use crate::storage::{keys, migrate, Result as StorageResult, SecureKvStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
    #[error("trusted-peer set is at capacity")]
    TrustedPeersFull,
}

pub type Result<T> = std::result::Result<T, IdentityError>;

struct Inner {
    static_kp: StaticKeypair,
    signing_kp: SigningKeypair,
    trusted: TrustedPeerSet,
}

/// Owns the device's persistent identity. One instance per running core;
/// shared behind `Arc` with session/mesh/facade layers that need to read
/// (but never mutate outside this manager) the identity.
pub struct IdentityManager {
    suite: CryptoSuite,
    store: Arc<dyn SecureKvStore>,
    peer_id: PeerId,
    inner: RwLock<Inner>,
}

impl IdentityManager {
    /// Load identity + signing keys + trusted-peer set from `store`,
    /// generating and persisting fresh keys if none exist. Corrupted
    /// individual values are treated as absent (regenerated), never a
    /// startup abort (spec.md §6).
    pub async fn initialize(suite: CryptoSuite, store: Arc<dyn SecureKvStore>) -> Result<Self> {
        let static_kp = match Self::load_static_keypair(&store).await? {
            Some(kp) => kp,
            None => {
                let kp = StaticKeypair::generate(&suite);
                Self::save_static_keypair(&store, &kp).await?;
                kp
            }
        };

        let signing_kp = match Self::load_signing_keypair(&store).await? {
            Some(kp) => kp,
            None => {
                let kp = SigningKeypair::generate(&suite);
                Self::save_signing_keypair(&store, &kp).await?;
                kp
            }
        };

        let trusted = match store.get(keys::TRUSTED_PEERS_V1).await? {
            Some(raw) => TrustedPeerSet::from_json(&raw),
            None => TrustedPeerSet::new(),
        };

        let peer_id = PeerId::from_static_public(&suite, &static_kp.public());

        Ok(Self {
            suite,
            store,
            peer_id,
            inner: RwLock::new(Inner {
                static_kp,
                signing_kp,
                trusted,
            }),
        })
    }

    async fn load_static_keypair(store: &Arc<dyn SecureKvStore>) -> StorageResult<Option<StaticKeypair>> {
        let public = migrate::load_key_bytes(store.as_ref(), keys::STATIC_PUBLIC_KEY).await?;
        let secret = migrate::load_key_bytes(store.as_ref(), keys::STATIC_PRIVATE_KEY).await?;
        Ok(match (public, secret) {
            (Some(p), Some(s)) => Some(StaticKeypair::from_bytes(p, s)),
            _ => None,
        })
    }

    async fn save_static_keypair(store: &Arc<dyn SecureKvStore>, kp: &StaticKeypair) -> StorageResult<()> {
        migrate::save_key_bytes(store.as_ref(), keys::STATIC_PUBLIC_KEY, &kp.public()).await?;
        migrate::save_key_bytes(
            store.as_ref(),
            keys::STATIC_PRIVATE_KEY,
            &kp.secret_bytes_for_storage(),
        )
        .await
    }

    async fn load_signing_keypair(store: &Arc<dyn SecureKvStore>) -> StorageResult<Option<SigningKeypair>> {
        let public = migrate::load_key_bytes(store.as_ref(), keys::SIGNING_PUBLIC_KEY).await?;
        let secret = migrate::load_key_bytes_64(store.as_ref(), keys::SIGNING_PRIVATE_KEY).await?;
        Ok(match (public, secret) {
            (Some(p), Some(s)) => Some(SigningKeypair::from_bytes(p, s)),
            _ => None,
        })
    }

    async fn save_signing_keypair(store: &Arc<dyn SecureKvStore>, kp: &SigningKeypair) -> StorageResult<()> {
        migrate::save_key_bytes(store.as_ref(), keys::SIGNING_PUBLIC_KEY, &kp.public()).await?;
        migrate::save_key_bytes(
            store.as_ref(),
            keys::SIGNING_PRIVATE_KEY,
            &kp.secret_bytes_for_storage(),
        )
        .await
    }

    pub fn my_peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub async fn static_public_key(&self) -> [u8; 32] {
        self.inner.read().await.static_kp.public()
    }

    pub async fn signing_public_key(&self) -> [u8; 32] {
        self.inner.read().await.signing_kp.public()
    }

    pub async fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        self.inner.read().await.static_kp.diffie_hellman(&self.suite, their_public)
    }

    pub async fn sign(&self, data: &[u8]) -> [u8; 64] {
        self.inner.read().await.signing_kp.sign(&self.suite, data)
    }

    pub async fn is_trusted(&self, peer: &PeerId) -> bool {
        self.inner.read().await.trusted.is_trusted(peer)
    }

    /// Trust a peer and persist the updated set before returning. The
    /// in-memory set is updated only after the storage write succeeds on
    /// the underlying store error path reaching the caller — this mirrors
    /// the "no fire-and-forget persistence" rule for group leave/join,
    /// applied here too since trust is a security-relevant mutation.
    pub async fn trust_peer(&self, peer: PeerId) -> Result<()> {
        let mut guard = self.inner.write().await;
        let mut candidate = TrustedPeerSet::from_json(&guard.trusted.to_json());
        if !candidate.trust(peer) {
            return Err(IdentityError::TrustedPeersFull);
        }
        self.store.set(keys::TRUSTED_PEERS_V1, &candidate.to_json()).await?;
        guard.trusted = candidate;
        Ok(())
    }

    pub async fn untrust_peer(&self, peer: &PeerId) -> Result<()> {
        let mut guard = self.inner.write().await;
        let mut candidate = TrustedPeerSet::from_json(&guard.trusted.to_json());
        candidate.untrust(peer);
        self.store.set(keys::TRUSTED_PEERS_V1, &candidate.to_json()).await?;
        guard.trusted = candidate;
        Ok(())
    }

    /// Wipe and regenerate the identity. Storage deletes are awaited
    /// before new keys are generated and persisted; the in-memory state
    /// is only swapped once every step has completed.
    pub async fn reset_identity(&mut self) -> Result<()> {
        let mut guard = self.inner.write().await;
        for k in [
            keys::STATIC_PRIVATE_KEY,
            keys::STATIC_PUBLIC_KEY,
            keys::SIGNING_PRIVATE_KEY,
            keys::SIGNING_PUBLIC_KEY,
            keys::TRUSTED_PEERS_V1,
        ] {
            self.store.delete(k).await?;
        }

        let static_kp = StaticKeypair::generate(&self.suite);
        Self::save_static_keypair(&self.store, &static_kp).await?;
        let signing_kp = SigningKeypair::generate(&self.suite);
        Self::save_signing_keypair(&self.store, &signing_kp).await?;

        self.peer_id = PeerId::from_static_public(&self.suite, &static_kp.public());
        *guard = Inner {
            static_kp,
            signing_kp,
            trusted: TrustedPeerSet::new(),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;

    async fn manager() -> IdentityManager {
        let suite = CryptoSuite::new();
        let store: Arc<dyn SecureKvStore> = Arc::new(MemoryKvStore::new());
        IdentityManager::initialize(suite, store).await.unwrap()
    }

    #[tokio::test]
    async fn initialize_generates_and_persists_keys() {
        let suite = CryptoSuite::new();
        let store: Arc<dyn SecureKvStore> = Arc::new(MemoryKvStore::new());
        let mgr = IdentityManager::initialize(suite, store.clone()).await.unwrap();
        let peer_id = mgr.my_peer_id();

        // Re-initializing against the same store restores the same identity.
        let suite2 = CryptoSuite::new();
        let mgr2 = IdentityManager::initialize(suite2, store).await.unwrap();
        assert_eq!(peer_id, mgr2.my_peer_id());
    }

    #[tokio::test]
    async fn trust_peer_round_trips() {
        let mgr = manager().await;
        let peer = PeerId([5u8; 32]);
        assert!(!mgr.is_trusted(&peer).await);
        mgr.trust_peer(peer).await.unwrap();
        assert!(mgr.is_trusted(&peer).await);
        mgr.untrust_peer(&peer).await.unwrap();
        assert!(!mgr.is_trusted(&peer).await);
    }

    #[tokio::test]
    async fn reset_identity_changes_peer_id() {
        let mut mgr = manager().await;
        let old_id = mgr.my_peer_id();
        mgr.reset_identity().await.unwrap();
        assert_ne!(old_id, mgr.my_peer_id());
    }

    #[tokio::test]
    async fn signing_works_after_load_from_storage() {
        let suite = CryptoSuite::new();
        let store: Arc<dyn SecureKvStore> = Arc::new(MemoryKvStore::new());
        let mgr1 = IdentityManager::initialize(suite, store.clone()).await.unwrap();
        let sig = mgr1.sign(b"hello").await;
        let pubkey = mgr1.signing_public_key().await;

        let suite2 = CryptoSuite::new();
        let mgr2 = IdentityManager::initialize(suite2, store).await.unwrap();
        assert!(suite2_verify(&pubkey, b"hello", &sig));
        assert_eq!(mgr2.signing_public_key().await, pubkey);
    }

    fn suite2_verify(pubkey: &[u8; 32], data: &[u8], sig: &[u8; 64]) -> bool {
        CryptoSuite::new().verify(pubkey, data, sig)
    }
}
