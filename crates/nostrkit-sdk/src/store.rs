// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Account store
//!
//! Implementor-supplied persistence for signer payloads, one opaque blob
//! per public key. All operations are total: a missing entry is `None`,
//! never an error.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nostrkit::PublicKey;
use tokio::sync::RwLock;

/// Opaque store backend error
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
    /// Wrap a backend error
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }
}

/// Signer payload persistence seam
#[async_trait]
pub trait AccountStore: fmt::Debug + Send + Sync {
    /// Persist a blob for a public key (overwrite allowed)
    async fn save(&self, public_key: &PublicKey, blob: Vec<u8>) -> Result<(), StoreError>;

    /// Load the blob for a public key
    async fn load(&self, public_key: &PublicKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// List all stored public keys
    async fn list(&self) -> Result<Vec<PublicKey>, StoreError>;

    /// Delete the entry for a public key (no-op when absent)
    async fn delete(&self, public_key: &PublicKey) -> Result<(), StoreError>;
}

/// In-memory account store (testing and ephemeral sessions)
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    blobs: Arc<RwLock<HashMap<PublicKey, Vec<u8>>>>,
}

impl MemoryAccountStore {
    /// New empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn save(&self, public_key: &PublicKey, blob: Vec<u8>) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().await;
        blobs.insert(*public_key, blob);
        Ok(())
    }

    async fn load(&self, public_key: &PublicKey) -> Result<Option<Vec<u8>>, StoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(public_key).cloned())
    }

    async fn list(&self) -> Result<Vec<PublicKey>, StoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.keys().copied().collect())
    }

    async fn delete(&self, public_key: &PublicKey) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(public_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nostrkit::Keys;

    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryAccountStore::new();
        let pk = Keys::generate().public_key();

        assert!(store.load(&pk).await.unwrap().is_none());

        store.save(&pk, b"blob".to_vec()).await.unwrap();
        assert_eq!(store.load(&pk).await.unwrap(), Some(b"blob".to_vec()));
        assert_eq!(store.list().await.unwrap(), vec![pk]);

        store.delete(&pk).await.unwrap();
        assert!(store.load(&pk).await.unwrap().is_none());

        // Delete of a missing entry is total
        store.delete(&pk).await.unwrap();
    }
}
