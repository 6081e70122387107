use std::fmt;
use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Upper bound of the sample fed to the compressibility probe.
pub const COMPRESSION_SAMPLE_SIZE: usize = 4096;

/// File name suffixes of formats that are already compressed.
const COMPRESSED_EXTENSIONS: &[&str] = &[
    "7z", "zip", "rar", "gz", "bz2", "xz", "lzma", "jpg", "jpeg", "png", "gif", "mp3", "mp4",
    "m4a", "avi", "mkv", "webm", "ogg",
];

/// Compression applied to every stored chunk of one stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "None"),
            Compression::Gzip => write!(f, "Gzip"),
        }
    }
}

impl Compression {
    /// Compress a block of data with set compression.
    pub fn compress(self, input: Bytes) -> Result<Bytes, std::io::Error> {
        match self {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(
                    Vec::with_capacity(input.len()),
                    flate2::Compression::default(),
                );
                encoder.write_all(&input)?;
                Ok(Bytes::from(encoder.finish()?))
            }
            Compression::None => Ok(input),
        }
    }
    /// Decompress a block of data using the set compression.
    pub fn decompress(self, input: Bytes, size_hint: usize) -> Result<Bytes, std::io::Error> {
        match self {
            Compression::Gzip => {
                let mut output = Vec::with_capacity(size_hint);
                GzDecoder::new(&input[..]).read_to_end(&mut output)?;
                Ok(Bytes::from(output))
            }
            Compression::None => Ok(input),
        }
    }
}

/// Report whether a sample of the stream shrinks under gzip.
///
/// At most [`COMPRESSION_SAMPLE_SIZE`] bytes are probed. An empty sample is
/// never compressible.
pub fn is_compressible(sample: &[u8]) -> bool {
    let sample = &sample[..sample.len().min(COMPRESSION_SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }
    match Compression::Gzip.compress(Bytes::copy_from_slice(sample)) {
        Ok(compressed) => compressed.len() < sample.len(),
        Err(_) => false,
    }
}

/// Case-insensitive check of a file name against the compressed-suffix
/// table. Callers use a hit to skip the compressibility probe.
pub fn is_compressed_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            let extension = extension.to_ascii_lowercase();
            COMPRESSED_EXTENSIONS.iter().any(|&e| e == extension)
        }
        _ => false,
    }
}
