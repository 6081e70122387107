use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::ChunkStore;
use crate::hashsum::HashSum;

/// In-memory chunk store, for tests and small embeddings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: Mutex<HashMap<HashSum, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs held.
    pub async fn len(&self) -> usize {
        self.chunks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.lock().await.is_empty()
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    type Error = Infallible;

    async fn put(&self, hash: &HashSum, data: Bytes) -> Result<(), Self::Error> {
        let mut chunks = self.chunks.lock().await;
        chunks.entry(hash.clone()).or_insert(data);
        Ok(())
    }

    async fn get(&self, hash: &HashSum) -> Result<Option<Bytes>, Self::Error> {
        Ok(self.chunks.lock().await.get(hash).cloned())
    }

    async fn has(&self, hash: &HashSum) -> Result<bool, Self::Error> {
        Ok(self.chunks.lock().await.contains_key(hash))
    }

    async fn delete(&self, hash: &HashSum) -> Result<bool, Self::Error> {
        Ok(self.chunks.lock().await.remove(hash).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_has_delete() {
        let store = MemoryStore::new();
        let hash = HashSum::sha512(b"blob");
        assert!(!store.has(&hash).await.unwrap());
        store.put(&hash, Bytes::from_static(b"blob")).await.unwrap();
        assert!(store.has(&hash).await.unwrap());
        assert_eq!(
            store.get(&hash).await.unwrap(),
            Some(Bytes::from_static(b"blob"))
        );
        assert!(store.delete(&hash).await.unwrap());
        assert!(!store.delete(&hash).await.unwrap());
        assert_eq!(store.get(&hash).await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_put_is_a_no_op() {
        let store = MemoryStore::new();
        let hash = HashSum::sha512(b"blob");
        store.put(&hash, Bytes::from_static(b"blob")).await.unwrap();
        store.put(&hash, Bytes::from_static(b"blob")).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get(&hash).await.unwrap(),
            Some(Bytes::from_static(b"blob"))
        );
    }
}
