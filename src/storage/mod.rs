//! Persistent key-value storage contract (spec.md §6 "Persistent storage").
//!
//! The core never touches a filesystem or platform keystore directly — the
//! host app implements [`SecureKvStore`] over whatever secure store it has
//! (Android Keystore, iOS Keychain, an encrypted SQLite file, ...) and the
//! core reads/writes through it. This mirrors the teacher's
//! `DeniableStorage` pattern: the trait is implemented by the app, the
//! core only defines the contract and the semantics around it.
//!
//! Two cross-cutting rules apply to every value the core reads back:
//! - a corrupted entry is treated as absent and regenerated where
//!   possible, never a startup abort (see `migrate::*` helpers below);
//! - a legacy hex-encoded key is accepted on read and immediately
//!   rewritten as base64 (see `migrate::load_key_bytes`).

use async_trait::async_trait;
use thiserror::Error;

pub mod keys;
pub mod migrate;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Plain get/set/delete contract over a secure key-value store, implemented
/// by the host application. All operations are async: a real backend may
/// hit disk or a platform API.
///
/// Read errors are always treated by callers as "absent" (spec §7
/// Storage taxonomy); write errors on critical paths (identity, group
/// create/join) MUST be surfaced to the caller rather than swallowed —
/// that surfacing happens at the call site, not in this trait.
#[async_trait]
pub trait SecureKvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// An in-memory `SecureKvStore` for tests and for hosts with no
/// persistence requirement (ephemeral identity).
#[derive(Default)]
pub struct MemoryKvStore {
    inner: tokio::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureKvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryKvStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
