//! Convergent self-encryption of byte streams.
//!
//! A stream is split into chunks, each chunk is compressed, encrypted with
//! AES-256-CFB and obfuscated with a rolling XOR pad, then written to a
//! content addressed chunk store under the SHA-512 of its ciphertext. All
//! key material is derived from the SHA-512 sums of the neighbouring chunk
//! plaintexts, so identical input always produces identical chunks and no
//! external keys exist. The result of encryption is a [`DataMap`] which,
//! together with the store, is sufficient to recover the original bytes.
//!
//! ```no_run
//! use selfcrypt::{decrypt, encrypt, EncryptOptions, MemoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let data = bytes::Bytes::from(std::fs::read("movie.mkv")?);
//! let map = encrypt(data.clone(), &store, &EncryptOptions::default()).await?;
//! assert_eq!(decrypt(&map, &store).await?, data);
//! # Ok(())
//! # }
//! ```

mod cipher;
mod compression;
mod data_map;
mod decrypt;
mod encrypt;
mod error;
mod hashsum;
mod params;
mod plan;
mod store;

pub use compression::{
    is_compressed_extension, is_compressible, Compression, COMPRESSION_SAMPLE_SIZE,
};
pub use data_map::{
    ChunkDetails, DataMap, FormatError, COMPRESSION_MASK, CRYPTO_AES256, CRYPTO_MASK,
    CRYPTO_NONE, DEFAULT_SELF_ENCRYPTION_TYPE, MAP_FORMAT_VERSION, OBFUSCATION_MASK,
    OBFUSCATION_NONE, OBFUSCATION_REPEATED, TYPE_COMPRESSION_GZIP, TYPE_COMPRESSION_NONE,
};
pub use decrypt::{decrypt, decrypt_to_file, decrypt_to_sink};
pub use encrypt::{encrypt, encrypt_file, EncryptOptions};
pub use error::{DecryptError, Error, InvalidInput};
pub use hashsum::HashSum;
pub use params::{
    SelfEncryptionParams, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_INCLUDABLE_CHUNK_SIZE,
    DEFAULT_MAX_INCLUDABLE_DATA_SIZE,
};
pub use plan::{plan, Plan};
pub use store::{
    all_chunks_exist, delete_all_chunks, missing_chunks, ChunkStore, DiskStore, MemoryStore,
};

/// Minimum number of chunks any chunked stream splits into.
pub const MIN_CHUNKS: usize = 3;

// Single buffer if we have a single core, otherwise number of cores x 2.
pub(crate) fn auto_chunk_buffers() -> usize {
    match num_cpus::get() {
        0 | 1 => 1,
        n => n * 2,
    }
}
