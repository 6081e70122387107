use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use log::*;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::cipher;
use crate::compression::{self, Compression};
use crate::data_map::{ChunkDetails, DataMap, DEFAULT_SELF_ENCRYPTION_TYPE};
use crate::error::Error;
use crate::hashsum::HashSum;
use crate::params::SelfEncryptionParams;
use crate::plan::{plan, Plan};
use crate::store::ChunkStore;

/// Options for [`encrypt`] and [`encrypt_file`].
#[derive(Clone, Debug)]
pub struct EncryptOptions {
    /// Chunk sizing parameters.
    pub params: SelfEncryptionParams,

    /// The input is known to be compressed already; skip the
    /// compressibility probe and store chunks uncompressed.
    pub already_compressed: bool,

    /// Number of chunks processed concurrently. 0 selects a value from the
    /// core count.
    pub num_chunk_buffers: usize,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            params: SelfEncryptionParams::default(),
            already_compressed: false,
            num_chunk_buffers: 0,
        }
    }
}

impl EncryptOptions {
    pub(crate) fn buffered_chunks(&self) -> usize {
        if self.num_chunk_buffers == 0 {
            crate::auto_chunk_buffers()
        } else {
            self.num_chunk_buffers
        }
    }
}

/// Self-encrypt `data`, writing ciphertext chunks into `store`.
///
/// Returns the data map describing the stream. Identical input under
/// identical parameters produces identical chunks, so repeated encryption
/// deduplicates against the store. A stream no bigger than
/// `max_includable_data_size` is carried in the map itself and touches the
/// store not at all.
pub async fn encrypt<S>(
    data: Bytes,
    store: &S,
    options: &EncryptOptions,
) -> Result<DataMap, Error<S::Error>>
where
    S: ChunkStore,
{
    match plan(data.len() as u64, &options.params)? {
        Plan::IncludeAll => Ok(include_whole(data)),
        Plan::Chunks { sizes, inline_tail } => {
            encrypt_chunks(data, sizes, inline_tail, store, options).await
        }
    }
}

/// Self-encrypt the file at `path` holding only a chunk window of
/// plaintext in memory.
///
/// The file is walked twice: a hashing pass over every chunk, then the
/// sealing pass. A file name with a known compressed suffix skips the
/// compressibility probe just like `already_compressed`.
pub async fn encrypt_file<S>(
    path: &Path,
    store: &S,
    options: &EncryptOptions,
) -> Result<DataMap, Error<S::Error>>
where
    S: ChunkStore,
{
    let len = fs::metadata(path).await?.len();
    let (sizes, inline_tail) = match plan(len, &options.params)? {
        Plan::IncludeAll => {
            return Ok(include_whole(Bytes::from(fs::read(path).await?)));
        }
        Plan::Chunks { sizes, inline_tail } => (sizes, inline_tail),
    };

    let already_compressed = options.already_compressed
        || path
            .file_name()
            .and_then(|name| name.to_str())
            .map(compression::is_compressed_extension)
            .unwrap_or(false);

    // Hashing pass. Every pre-hash must be known before any chunk can be
    // sealed, see encrypt_chunks.
    let mut pre_hashes = Vec::with_capacity(sizes.len());
    let mut sample = Vec::new();
    {
        let mut file = fs::File::open(path).await?;
        for (index, &size) in sizes.iter().enumerate() {
            let mut buf = vec![0u8; size];
            file.read_exact(&mut buf).await?;
            if index == 0 && !already_compressed {
                sample = buf[..size.min(compression::COMPRESSION_SAMPLE_SIZE)].to_vec();
            }
            pre_hashes.push(HashSum::sha512(&buf));
        }
    }
    let compression = if already_compressed || !compression::is_compressible(&sample) {
        Compression::None
    } else {
        Compression::Gzip
    };

    // Sealing pass: chunks are read back one by one and sealed in
    // parallel, results arriving in source order.
    let pre_hashes = Arc::new(pre_hashes);
    let sizes = Arc::new(sizes);
    let stored_count = sizes.len() - usize::from(inline_tail);
    let file = fs::File::open(path).await?;

    let mut details: Vec<ChunkDetails> = Vec::with_capacity(sizes.len());
    {
        let reader_sizes = Arc::clone(&sizes);
        let chunk_reader = stream::try_unfold((file, 0usize), move |(mut file, index)| {
            let sizes = Arc::clone(&reader_sizes);
            async move {
                if index == stored_count {
                    return Ok(None);
                }
                let mut buf = vec![0u8; sizes[index]];
                file.read_exact(&mut buf).await?;
                Ok::<_, std::io::Error>(Some(((index, Bytes::from(buf)), (file, index + 1))))
            }
        });
        let mut seal_stream = Box::pin(
            chunk_reader
                .map(|read_result| {
                    let pre_hashes = Arc::clone(&pre_hashes);
                    async move {
                        let (index, chunk) = read_result?;
                        let (hash, sealed) = tokio::task::spawn_blocking(move || {
                            seal_chunk(index, chunk, compression, &pre_hashes)
                        })
                        .await??;
                        debug!("chunk {} sealed as '{}', {} bytes", index, hash, sealed.len());
                        let size = sealed.len() as u64;
                        store.put(&hash, sealed).await.map_err(Error::Storage)?;
                        Ok::<_, Error<S::Error>>((index, hash, size))
                    }
                })
                .buffered(options.buffered_chunks()),
        );

        while let Some(result) = seal_stream.next().await {
            let (index, hash, size) = result?;
            details.push(ChunkDetails {
                pre_hash: pre_hashes[index].clone(),
                pre_size: sizes[index] as u64,
                hash,
                size,
                content: Bytes::new(),
            });
        }
    }

    if inline_tail {
        let index = sizes.len() - 1;
        let mut file = fs::File::open(path).await?;
        file.seek(SeekFrom::Start(len - sizes[index] as u64)).await?;
        let mut buf = vec![0u8; sizes[index]];
        file.read_exact(&mut buf).await?;
        details.push(included_tail(index, &pre_hashes, Bytes::from(buf)));
    }

    Ok(DataMap {
        self_encryption_type: DEFAULT_SELF_ENCRYPTION_TYPE,
        compression,
        size: len,
        content: Bytes::new(),
        chunks: details,
    })
}

async fn encrypt_chunks<S>(
    data: Bytes,
    sizes: Vec<usize>,
    inline_tail: bool,
    store: &S,
    options: &EncryptOptions,
) -> Result<DataMap, Error<S::Error>>
where
    S: ChunkStore,
{
    // Slice the input into plaintext chunks, zero copy.
    let mut chunks = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for &size in &sizes {
        chunks.push(data.slice(offset..offset + size));
        offset += size;
    }

    // Pre-hash barrier. Chunk keys depend on the two predecessor
    // pre-hashes and the first two chunks wrap around to the end of the
    // stream, so no chunk may be sealed before every chunk is hashed.
    let pre_hashes = {
        let mut hash_stream = stream::iter(
            chunks
                .iter()
                .cloned()
                .map(|chunk| tokio::task::spawn_blocking(move || HashSum::sha512(&chunk))),
        )
        .buffered(options.buffered_chunks());
        let mut hashes = Vec::with_capacity(chunks.len());
        while let Some(result) = hash_stream.next().await {
            hashes.push(result?);
        }
        hashes
    };

    // Compression is decided once per stream, on the first chunk.
    let compression = if options.already_compressed || !compression::is_compressible(&chunks[0]) {
        Compression::None
    } else {
        Compression::Gzip
    };

    let pre_hashes = Arc::new(pre_hashes);
    let stored_count = sizes.len() - usize::from(inline_tail);

    let mut details = Vec::with_capacity(sizes.len());
    {
        let mut seal_stream = stream::iter(chunks[..stored_count].iter().cloned().enumerate().map(
            |(index, chunk)| {
                let pre_hashes = Arc::clone(&pre_hashes);
                async move {
                    let (hash, sealed) = tokio::task::spawn_blocking(move || {
                        seal_chunk(index, chunk, compression, &pre_hashes)
                    })
                    .await??;
                    debug!("chunk {} sealed as '{}', {} bytes", index, hash, sealed.len());
                    let size = sealed.len() as u64;
                    store.put(&hash, sealed).await.map_err(Error::Storage)?;
                    Ok::<_, Error<S::Error>>((hash, size))
                }
            },
        ))
        .buffered(options.buffered_chunks());

        // buffered() delivers in source order even though the seal tasks
        // complete in any order.
        let mut index = 0;
        while let Some(result) = seal_stream.next().await {
            let (hash, size) = result?;
            details.push(ChunkDetails {
                pre_hash: pre_hashes[index].clone(),
                pre_size: sizes[index] as u64,
                hash,
                size,
                content: Bytes::new(),
            });
            index += 1;
        }
    }

    if inline_tail {
        let index = sizes.len() - 1;
        details.push(included_tail(index, &pre_hashes, chunks[index].clone()));
    }

    Ok(DataMap {
        self_encryption_type: DEFAULT_SELF_ENCRYPTION_TYPE,
        compression,
        size: data.len() as u64,
        content: Bytes::new(),
        chunks: details,
    })
}

// CPU-bound part of sealing one chunk, run on a blocking thread.
fn seal_chunk(
    index: usize,
    chunk: Bytes,
    compression: Compression,
    pre_hashes: &[HashSum],
) -> Result<(HashSum, Bytes), std::io::Error> {
    let keys = cipher::chunk_keys(index, pre_hashes);
    let sealed = cipher::encrypt_chunk(compression.compress(chunk)?, &keys);
    let hash = HashSum::sha512(&sealed);
    Ok((hash, sealed))
}

fn included_tail(index: usize, pre_hashes: &[HashSum], content: Bytes) -> ChunkDetails {
    debug!(
        "tail chunk {} ({} bytes) carried in the data map",
        index,
        content.len()
    );
    ChunkDetails {
        pre_hash: pre_hashes[index].clone(),
        pre_size: content.len() as u64,
        hash: HashSum::new(),
        size: 0,
        content,
    }
}

fn include_whole(data: Bytes) -> DataMap {
    DataMap {
        self_encryption_type: DEFAULT_SELF_ENCRYPTION_TYPE,
        compression: Compression::None,
        size: data.len() as u64,
        content: data,
        chunks: Vec::new(),
    }
}
