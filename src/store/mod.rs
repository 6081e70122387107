//! Content addressed chunk stores.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use log::*;

use crate::data_map::DataMap;
use crate::error::Error;
use crate::hashsum::HashSum;

/// A content addressed blob store for encrypted chunks.
///
/// Keys are the SHA-512 of the stored bytes, so a second `put` of the same
/// hash must leave the store unchanged. Implementations must accept
/// concurrent calls for different hashes; no ordering or transactional
/// guarantees are required.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store `data` under `hash`. Idempotent.
    async fn put(&self, hash: &HashSum, data: Bytes) -> Result<(), Self::Error>;
    /// Fetch the blob stored under `hash`, or `None` if absent.
    async fn get(&self, hash: &HashSum) -> Result<Option<Bytes>, Self::Error>;
    /// Whether a blob is stored under `hash`.
    async fn has(&self, hash: &HashSum) -> Result<bool, Self::Error>;
    /// Remove the blob under `hash`, reporting whether it existed.
    async fn delete(&self, hash: &HashSum) -> Result<bool, Self::Error>;
}

/// Collect the stored hashes `map` references but `store` lacks.
pub async fn missing_chunks<S>(map: &DataMap, store: &S) -> Result<Vec<HashSum>, S::Error>
where
    S: ChunkStore,
{
    let mut missing = Vec::new();
    for hash in map.stored_hashes() {
        if !store.has(hash).await? {
            missing.push(hash.clone());
        }
    }
    Ok(missing)
}

/// Whether every stored chunk of `map` is present in `store`.
pub async fn all_chunks_exist<S>(map: &DataMap, store: &S) -> Result<bool, S::Error>
where
    S: ChunkStore,
{
    Ok(missing_chunks(map, store).await?.is_empty())
}

/// Remove every stored chunk `map` references.
///
/// Chunks are shared between data maps of identical content; callers are
/// responsible for knowing that no other map still references them.
pub async fn delete_all_chunks<S>(map: &DataMap, store: &S) -> Result<(), Error<S::Error>>
where
    S: ChunkStore,
{
    for hash in map.stored_hashes() {
        if !store.delete(hash).await.map_err(Error::Storage)? {
            debug!("chunk '{}' was already gone", hash);
        }
    }
    Ok(())
}
