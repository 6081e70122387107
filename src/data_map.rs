//! Data map structure and its serialized form.
//!
//! | Offset | Size | Description                                          |
//! |--------|------|------------------------------------------------------|
//! |      0 |    1 | Format version (1).                                  |
//! |      1 |    8 | Source stream size (u64 le).                         |
//! |      9 |    8 | Inlined content size (u64 le).                       |
//! |     17 |    n | Inlined content.                                     |
//! | 17 + n |    4 | Self-encryption type tag (u32 le).                   |
//! | 21 + n |    1 | Compression tag (0 = none, 1 = gzip).                |
//! | 22 + n |    8 | Chunk count (u64 le).                                |
//!
//! Each chunk descriptor follows as: pre-hash (64 bytes), pre-size
//! (u64 le), store hash (u8 length, then that many bytes — zero length for
//! an included tail), stored size (u64 le), inlined chunk content
//! (u32 le length, then that many bytes).

use bytes::Bytes;

use crate::compression::Compression;
use crate::hashsum::HashSum;

/// Mask picking the compression field out of a self-encryption type tag.
pub const COMPRESSION_MASK: u32 = 0x000F;
/// Mask picking the obfuscation field out of a self-encryption type tag.
pub const OBFUSCATION_MASK: u32 = 0x00F0;
/// Mask picking the crypto field out of a self-encryption type tag.
pub const CRYPTO_MASK: u32 = 0x0F00;

pub const TYPE_COMPRESSION_NONE: u32 = 0x0000;
pub const TYPE_COMPRESSION_GZIP: u32 = 0x0001;
pub const OBFUSCATION_NONE: u32 = 0x0000;
pub const OBFUSCATION_REPEATED: u32 = 0x0010;
pub const CRYPTO_NONE: u32 = 0x0000;
pub const CRYPTO_AES256: u32 = 0x0100;

/// The production pipeline: gzip, repeated-pad obfuscation, AES-256.
pub const DEFAULT_SELF_ENCRYPTION_TYPE: u32 =
    TYPE_COMPRESSION_GZIP | OBFUSCATION_REPEATED | CRYPTO_AES256;

/// Version tag of the serialized data map format.
pub const MAP_FORMAT_VERSION: u8 = 1;

/// Descriptor of one chunk of the source stream, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkDetails {
    /// SHA-512 of the chunk plaintext, before compression.
    pub pre_hash: HashSum,
    /// Plaintext length in bytes.
    pub pre_size: u64,
    /// SHA-512 of the stored ciphertext, which is also the chunk's address
    /// in the store. Empty for a tail chunk carried in `content`.
    pub hash: HashSum,
    /// Stored ciphertext length in bytes. 0 for an included tail.
    pub size: u64,
    /// Chunk plaintext, populated only for an included tail chunk.
    pub content: Bytes,
}

impl ChunkDetails {
    /// Whether this chunk lives in the data map rather than the store.
    pub fn is_included(&self) -> bool {
        self.hash.is_empty()
    }
}

/// The manifest of one self-encrypted stream.
///
/// Lists every chunk in source order with its plaintext and ciphertext
/// hashes; together with the chunk store this is sufficient to recover the
/// original bytes. Small streams skip chunking and carry their bytes in
/// `content` directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataMap {
    /// Pipeline variant tag, see the `COMPRESSION_MASK` family.
    pub self_encryption_type: u32,
    /// Compression actually applied to the stored chunks.
    pub compression: Compression,
    /// Total plaintext length of the source stream.
    pub size: u64,
    /// The whole source stream, for streams small enough to skip chunking.
    pub content: Bytes,
    /// Chunk descriptors, empty when `content` carries the stream.
    pub chunks: Vec<ChunkDetails>,
}

impl Default for DataMap {
    fn default() -> Self {
        Self {
            self_encryption_type: DEFAULT_SELF_ENCRYPTION_TYPE,
            compression: Compression::None,
            size: 0,
            content: Bytes::new(),
            chunks: Vec::new(),
        }
    }
}

impl DataMap {
    /// Total plaintext length of the source stream.
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Length of the inlined whole-stream content.
    pub fn content_size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Hashes of every chunk stored as a blob (included tails carry none).
    pub fn stored_hashes(&self) -> impl Iterator<Item = &HashSum> {
        self.chunks
            .iter()
            .filter(|chunk| !chunk.is_included())
            .map(|chunk| &chunk.hash)
    }

    /// Serialize to the stable format described in the module docs.
    pub fn serialize(&self) -> Vec<u8> {
        let chunk_bytes: usize = self
            .chunks
            .iter()
            .map(|c| 64 + 8 + 1 + c.hash.len() + 8 + 4 + c.content.len())
            .sum();
        let mut buf = Vec::with_capacity(30 + self.content.len() + chunk_bytes);

        buf.push(MAP_FORMAT_VERSION);
        buf.extend(self.size.to_le_bytes());
        buf.extend((self.content.len() as u64).to_le_bytes());
        buf.extend(&self.content[..]);
        buf.extend(self.self_encryption_type.to_le_bytes());
        buf.push(match self.compression {
            Compression::None => 0,
            Compression::Gzip => 1,
        });
        buf.extend((self.chunks.len() as u64).to_le_bytes());
        for chunk in &self.chunks {
            buf.extend(chunk.pre_hash.slice());
            buf.extend(chunk.pre_size.to_le_bytes());
            buf.push(chunk.hash.len() as u8);
            buf.extend(chunk.hash.slice());
            buf.extend(chunk.size.to_le_bytes());
            buf.extend((chunk.content.len() as u32).to_le_bytes());
            buf.extend(&chunk.content[..]);
        }
        buf
    }

    /// Parse a serialized data map.
    pub fn deserialize(buf: &[u8]) -> Result<Self, FormatError> {
        let mut parser = Parser(buf);
        let version = parser.take_u8()?;
        if version != MAP_FORMAT_VERSION {
            return Err(FormatError::UnknownVersion(version));
        }
        let size = parser.take_u64()?;
        let content_size = parser.take_u64()?;
        let content = Bytes::copy_from_slice(parser.take(content_size as usize)?);
        let self_encryption_type = parser.take_u32()?;
        let compression = match parser.take_u8()? {
            0 => Compression::None,
            1 => Compression::Gzip,
            tag => return Err(FormatError::UnknownCompression(tag)),
        };
        let chunk_count = parser.take_u64()?;
        let mut chunks = Vec::with_capacity(chunk_count.min(4096) as usize);
        for _ in 0..chunk_count {
            let pre_hash = HashSum::from_slice(parser.take(64)?);
            let pre_size = parser.take_u64()?;
            let hash_len = parser.take_u8()? as usize;
            let hash = HashSum::from_slice(parser.take(hash_len)?);
            let size = parser.take_u64()?;
            let content_len = parser.take_u32()? as usize;
            let content = Bytes::copy_from_slice(parser.take(content_len)?);
            chunks.push(ChunkDetails {
                pre_hash,
                pre_size,
                hash,
                size,
                content,
            });
        }
        if !parser.0.is_empty() {
            return Err(FormatError::TrailingBytes);
        }
        Ok(Self {
            self_encryption_type,
            compression,
            size,
            content,
            chunks,
        })
    }
}

/// Error from parsing a serialized data map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    UnknownVersion(u8),
    UnknownCompression(u8),
    UnexpectedEnd,
    TrailingBytes,
}

impl std::error::Error for FormatError {}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownVersion(version) => write!(f, "unknown format version {}", version),
            Self::UnknownCompression(tag) => write!(f, "unknown compression tag {}", tag),
            Self::UnexpectedEnd => write!(f, "unexpected end of data"),
            Self::TrailingBytes => write!(f, "trailing bytes after data map"),
        }
    }
}

struct Parser<'a>(&'a [u8]);

impl<'a> Parser<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if self.0.len() < len {
            return Err(FormatError::UnexpectedEnd);
        }
        let (head, tail) = self.0.split_at(len);
        self.0 = tail;
        Ok(head)
    }
    fn take_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }
    fn take_u32(&mut self) -> Result<u32, FormatError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }
    fn take_u64(&mut self) -> Result<u64, FormatError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_map() -> DataMap {
        DataMap {
            self_encryption_type: DEFAULT_SELF_ENCRYPTION_TYPE,
            compression: Compression::Gzip,
            size: 12345,
            content: Bytes::new(),
            chunks: vec![
                ChunkDetails {
                    pre_hash: HashSum::sha512(b"first"),
                    pre_size: 10000,
                    hash: HashSum::sha512(b"first stored"),
                    size: 9876,
                    content: Bytes::new(),
                },
                ChunkDetails {
                    pre_hash: HashSum::sha512(b"second"),
                    pre_size: 2100,
                    hash: HashSum::sha512(b"second stored"),
                    size: 2050,
                    content: Bytes::new(),
                },
                ChunkDetails {
                    pre_hash: HashSum::sha512(b"tail"),
                    pre_size: 245,
                    hash: HashSum::new(),
                    size: 0,
                    content: Bytes::from(vec![7u8; 245]),
                },
            ],
        }
    }

    #[test]
    fn round_trip_chunked_map() {
        let map = example_map();
        let restored = DataMap::deserialize(&map.serialize()).unwrap();
        assert_eq!(restored, map);
        assert!(restored.chunks[2].is_included());
    }

    #[test]
    fn round_trip_included_map() {
        let map = DataMap {
            self_encryption_type: DEFAULT_SELF_ENCRYPTION_TYPE,
            compression: Compression::None,
            size: 7,
            content: Bytes::from_static(b"abcdefg"),
            chunks: Vec::new(),
        };
        assert_eq!(DataMap::deserialize(&map.serialize()).unwrap(), map);
    }

    #[test]
    fn truncation_is_detected() {
        let raw = example_map().serialize();
        for len in [0, 5, 20, raw.len() - 1] {
            assert_eq!(
                DataMap::deserialize(&raw[..len]),
                Err(FormatError::UnexpectedEnd)
            );
        }
    }

    #[test]
    fn trailing_bytes_are_detected() {
        let mut raw = example_map().serialize();
        raw.push(0);
        assert_eq!(DataMap::deserialize(&raw), Err(FormatError::TrailingBytes));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut raw = example_map().serialize();
        raw[0] = 9;
        assert_eq!(DataMap::deserialize(&raw), Err(FormatError::UnknownVersion(9)));
    }

    #[test]
    fn default_type_tag_fields() {
        let tag = DEFAULT_SELF_ENCRYPTION_TYPE;
        assert_eq!(tag & COMPRESSION_MASK, TYPE_COMPRESSION_GZIP);
        assert_eq!(tag & OBFUSCATION_MASK, OBFUSCATION_REPEATED);
        assert_eq!(tag & CRYPTO_MASK, CRYPTO_AES256);
    }
}
