use sha2::{Digest, Sha512};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A hash sum, naming either a chunk's plaintext or its stored ciphertext.
///
/// An empty sum marks a chunk that is carried inside the data map instead
/// of the store.
#[derive(Clone, Debug, Default, Eq)]
pub struct HashSum(SmallVec<[u8; 64]>);

impl HashSum {
    /// Create new empty hash sum.
    pub fn new() -> Self {
        Self::default()
    }
    /// Create new hash sum using SHA-512 to digest the given data.
    pub fn sha512(data: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(data);
        Self(SmallVec::from_slice(hasher.finalize().as_slice()))
    }
    /// Create new hash sum from vec.
    pub fn from_vec(v: Vec<u8>) -> Self {
        Self(v.into())
    }
    /// Create new hash sum from slice.
    pub fn from_slice(s: &[u8]) -> Self {
        Self(SmallVec::from_slice(s))
    }
    /// Returns a new vec containing the hash sum.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
    /// Returns the hash sum as a slice.
    pub fn slice(&self) -> &[u8] {
        &self.0[..]
    }
    /// Returns the length of the hash sum in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
    /// Returns true if the hash sum is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for HashSum {
    fn from(v: Vec<u8>) -> Self {
        Self::from_vec(v)
    }
}

impl From<&[u8]> for HashSum {
    fn from(v: &[u8]) -> Self {
        Self::from_slice(v)
    }
}

impl Hash for HashSum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialEq<Vec<u8>> for HashSum {
    fn eq(&self, other: &Vec<u8>) -> bool {
        self.0[..] == other[..]
    }
}

impl PartialEq<&[u8]> for HashSum {
    fn eq(&self, other: &&[u8]) -> bool {
        self.0[..] == other[..]
    }
}

impl PartialEq<HashSum> for HashSum {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl fmt::Display for HashSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
