//! Blob storage used to offload oversized message payloads
//!
//! The broker never sees blobs; the client-side offload decorator saves the
//! payload, sends a reference, and loads it back on receive.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    #[error("blob {blob_ref} not found")]
    NotFound { blob_ref: String },

    #[error("blob backend failure: {message}")]
    Backend { message: String },
}

/// Store for payload bytes addressed by an opaque reference
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes`, returning the reference to load them by
    async fn save(&self, bytes: Vec<u8>) -> Result<String, BlobError>;

    async fn load(&self, blob_ref: &str) -> Result<Vec<u8>, BlobError>;

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobError>;
}

/// In-process blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blobs currently stored
    pub fn len(&self) -> usize {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, bytes: Vec<u8>) -> Result<String, BlobError> {
        let blob_ref = format!("blob-{:016x}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(blob_ref.clone(), bytes);
        Ok(blob_ref)
    }

    async fn load(&self, blob_ref: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                blob_ref: blob_ref.to_string(),
            })
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(blob_ref)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound {
                blob_ref: blob_ref.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = MemoryBlobStore::new();

        let blob_ref = store.save(b"payload".to_vec()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&blob_ref).await.unwrap(), b"payload".to_vec());

        store.delete(&blob_ref).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.load(&blob_ref).await,
            Err(BlobError::NotFound { blob_ref })
        );
    }

    #[tokio::test]
    async fn test_references_are_unique() {
        let store = MemoryBlobStore::new();
        let first = store.save(Vec::new()).await.unwrap();
        let second = store.save(Vec::new()).await.unwrap();
        assert_ne!(first, second);
    }
}
