use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::ChunkStore;
use crate::hashsum::HashSum;

/// Chunk store keeping each blob in a file under a root directory.
///
/// The file name is the lowercase hex of the blob's hash; the file content
/// is the raw ciphertext.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, io::Error> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, hash: &HashSum) -> PathBuf {
        self.root.join(hash.to_string())
    }
}

#[async_trait]
impl ChunkStore for DiskStore {
    type Error = io::Error;

    async fn put(&self, hash: &HashSum, data: Bytes) -> Result<(), Self::Error> {
        let path = self.path_of(hash);
        // Content addressed: an existing file already holds these bytes.
        if fs::try_exists(&path).await? {
            return Ok(());
        }
        fs::write(&path, &data).await
    }

    async fn get(&self, hash: &HashSum) -> Result<Option<Bytes>, Self::Error> {
        match fs::read(self.path_of(hash)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn has(&self, hash: &HashSum) -> Result<bool, Self::Error> {
        fs::try_exists(self.path_of(hash)).await
    }

    async fn delete(&self, hash: &HashSum) -> Result<bool, Self::Error> {
        match fs::remove_file(self.path_of(hash)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}
