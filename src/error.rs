use std::path::PathBuf;

use crate::HashSum;

/// Reason an input or parameter set was rejected before any work was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInput {
    /// The input stream is empty.
    EmptyInput,
    /// The self-encryption parameters fail validation.
    BadParams,
}

impl std::error::Error for InvalidInput {}

impl std::fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "input is empty"),
            Self::BadParams => write!(f, "invalid self-encryption parameters"),
        }
    }
}

/// An integrity failure while reassembling a stream.
///
/// Any of these is fatal for the operation; no partial plaintext is ever
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// Stored chunks the data map references are absent from the store.
    MissingChunks(Vec<HashSum>),
    /// The fetched ciphertext does not digest to its store address.
    ChunkHashMismatch { index: usize },
    /// The recovered plaintext does not digest to the recorded pre-hash.
    PlainHashMismatch { index: usize },
    /// The recovered plaintext has the wrong length.
    LengthMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },
    /// The chunk body did not decompress.
    Decompress { index: usize },
    /// The inlined whole-stream content does not match the recorded size.
    ContentSizeMismatch { expected: u64, actual: u64 },
}

impl std::error::Error for DecryptError {}

impl std::fmt::Display for DecryptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingChunks(hashes) => {
                write!(f, "{} chunk(s) missing from store:", hashes.len())?;
                for hash in hashes {
                    write!(f, " {}", hash)?;
                }
                Ok(())
            }
            Self::ChunkHashMismatch { index } => {
                write!(f, "chunk {} ciphertext hash mismatch", index)
            }
            Self::PlainHashMismatch { index } => {
                write!(f, "chunk {} plaintext hash mismatch", index)
            }
            Self::LengthMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "chunk {} length mismatch (expected {}, got {})",
                index, expected, actual
            ),
            Self::Decompress { index } => write!(f, "chunk {} failed to decompress", index),
            Self::ContentSizeMismatch { expected, actual } => write!(
                f,
                "inlined content size mismatch (expected {}, got {})",
                expected, actual
            ),
        }
    }
}

/// Error from encrypting or decrypting a stream, generic over the chunk
/// store's error type.
#[derive(Debug)]
pub enum Error<S> {
    InvalidInput(InvalidInput),
    Decrypt(DecryptError),
    FileAlreadyExists(PathBuf),
    IO(std::io::Error),
    Storage(S),
    ThreadJoin(tokio::task::JoinError),
}

impl<S> std::error::Error for Error<S> where S: std::error::Error {}

impl<S> std::fmt::Display for Error<S>
where
    S: std::error::Error,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {}", err),
            Self::Decrypt(err) => write!(f, "decrypt error: {}", err),
            Self::FileAlreadyExists(path) => {
                write!(f, "output file {} already exists", path.display())
            }
            Self::IO(err) => write!(f, "i/o error: {}", err),
            Self::Storage(err) => write!(f, "storage error: {}", err),
            Self::ThreadJoin(err) => write!(f, "error joining thread: {}", err),
        }
    }
}

impl<S> From<InvalidInput> for Error<S> {
    fn from(e: InvalidInput) -> Self {
        Self::InvalidInput(e)
    }
}

impl<S> From<DecryptError> for Error<S> {
    fn from(e: DecryptError) -> Self {
        Self::Decrypt(e)
    }
}

impl<S> From<std::io::Error> for Error<S> {
    fn from(e: std::io::Error) -> Self {
        Self::IO(e)
    }
}

impl<S> From<tokio::task::JoinError> for Error<S> {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::ThreadJoin(e)
    }
}
