use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use log::*;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cipher;
use crate::compression::Compression;
use crate::data_map::{ChunkDetails, DataMap};
use crate::error::{DecryptError, Error};
use crate::hashsum::HashSum;
use crate::store::{missing_chunks, ChunkStore};

/// Reassemble the plaintext a data map describes.
///
/// Every stored chunk is verified against its store address before and
/// against its pre-hash after decryption; any mismatch fails the whole
/// operation and no partial plaintext is returned.
pub async fn decrypt<S>(map: &DataMap, store: &S) -> Result<Bytes, Error<S::Error>>
where
    S: ChunkStore,
{
    let mut out = Vec::with_capacity(map.size as usize);
    decrypt_to_sink(map, store, &mut out).await?;
    Ok(Bytes::from(out))
}

/// Reassemble the stream into `sink`, chunk by chunk in source order.
pub async fn decrypt_to_sink<S, W>(
    map: &DataMap,
    store: &S,
    sink: &mut W,
) -> Result<(), Error<S::Error>>
where
    S: ChunkStore,
    W: AsyncWrite + Unpin,
{
    if map.chunks.is_empty() {
        if map.content.len() as u64 != map.size {
            return Err(Error::Decrypt(DecryptError::ContentSizeMismatch {
                expected: map.size,
                actual: map.content.len() as u64,
            }));
        }
        sink.write_all(&map.content).await?;
        sink.flush().await?;
        return Ok(());
    }

    let missing = missing_chunks(map, store).await.map_err(Error::Storage)?;
    if !missing.is_empty() {
        return Err(Error::Decrypt(DecryptError::MissingChunks(missing)));
    }

    let pre_hashes: Arc<Vec<HashSum>> =
        Arc::new(map.chunks.iter().map(|c| c.pre_hash.clone()).collect());
    let compression = map.compression;

    let mut chunk_stream = stream::iter(map.chunks.iter().cloned().enumerate().map(
        |(index, chunk)| {
            let pre_hashes = Arc::clone(&pre_hashes);
            async move {
                if chunk.is_included() {
                    return Ok(chunk.content);
                }
                let data = store
                    .get(&chunk.hash)
                    .await
                    .map_err(Error::Storage)?
                    .ok_or_else(|| DecryptError::MissingChunks(vec![chunk.hash.clone()]))?;
                let plain = tokio::task::spawn_blocking(move || {
                    open_chunk(index, chunk, data, compression, &pre_hashes)
                })
                .await??;
                debug!("chunk {} opened, {} bytes", index, plain.len());
                Ok::<_, Error<S::Error>>(plain)
            }
        },
    ))
    .buffered(crate::auto_chunk_buffers());

    // buffered() delivers in source order even though chunks open in any
    // order.
    while let Some(result) = chunk_stream.next().await {
        sink.write_all(&result?).await?;
    }
    sink.flush().await?;
    Ok(())
}

/// Reassemble the stream into the file at `path`.
///
/// Refuses to clobber an existing file unless `overwrite` is set.
pub async fn decrypt_to_file<S>(
    map: &DataMap,
    store: &S,
    path: &Path,
    overwrite: bool,
) -> Result<(), Error<S::Error>>
where
    S: ChunkStore,
{
    if !overwrite && fs::try_exists(path).await? {
        return Err(Error::FileAlreadyExists(path.to_path_buf()));
    }
    let mut file = fs::File::create(path).await?;
    decrypt_to_sink(map, store, &mut file).await
}

// CPU-bound part of opening one fetched chunk, run on a blocking thread.
fn open_chunk(
    index: usize,
    chunk: ChunkDetails,
    data: Bytes,
    compression: Compression,
    pre_hashes: &[HashSum],
) -> Result<Bytes, DecryptError> {
    if HashSum::sha512(&data) != chunk.hash {
        return Err(DecryptError::ChunkHashMismatch { index });
    }
    let keys = cipher::chunk_keys(index, pre_hashes);
    let plain = cipher::decrypt_chunk(data, &keys);
    let plain = compression
        .decompress(plain, chunk.pre_size as usize)
        .map_err(|_| DecryptError::Decompress { index })?;
    if HashSum::sha512(&plain) != chunk.pre_hash {
        return Err(DecryptError::PlainHashMismatch { index });
    }
    if plain.len() as u64 != chunk.pre_size {
        return Err(DecryptError::LengthMismatch {
            index,
            expected: chunk.pre_size,
            actual: plain.len() as u64,
        });
    }
    Ok(plain)
}
