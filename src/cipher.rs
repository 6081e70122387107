//! Per-chunk key derivation and the encrypt/obfuscate transforms.
//!
//! All key material for chunk `n` comes from the plaintext hashes of its
//! two predecessors (wrapping around at the front of the stream) and of
//! the chunk itself. The derivation is fixed; changing any offset breaks
//! every existing ciphertext.

use aes::Aes256;
use bytes::{Bytes, BytesMut};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};

use crate::HashSum;

pub(crate) const KEY_SIZE: usize = 32;
pub(crate) const IV_SIZE: usize = 16;
pub(crate) const PAD_SIZE: usize = 144;

type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// Key material for one chunk.
pub(crate) struct ChunkKeys {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
    pad: [u8; PAD_SIZE],
}

/// Derive the AES key, IV and obfuscation pad for chunk `index`.
///
/// With `A` the pre-hash of the previous chunk, `B` the one before that
/// and `S` the chunk's own pre-hash:
/// key = `A[0..32]`, iv = `A[32..48]`, pad = `A || S || B[48..64]`.
pub(crate) fn chunk_keys(index: usize, pre_hashes: &[HashSum]) -> ChunkKeys {
    let n = pre_hashes.len();
    let this = pre_hashes[index].slice();
    let n_1 = pre_hashes[(index + n - 1) % n].slice();
    let n_2 = pre_hashes[(index + n - 2) % n].slice();

    let mut key = [0u8; KEY_SIZE];
    let mut iv = [0u8; IV_SIZE];
    let mut pad = [0u8; PAD_SIZE];
    key.copy_from_slice(&n_1[..KEY_SIZE]);
    iv.copy_from_slice(&n_1[KEY_SIZE..KEY_SIZE + IV_SIZE]);
    pad[..64].copy_from_slice(n_1);
    pad[64..128].copy_from_slice(this);
    pad[128..].copy_from_slice(&n_2[48..]);
    ChunkKeys { key, iv, pad }
}

/// XOR obfuscator cycling a 144 byte pad over a byte stream.
///
/// The pad index rolls across invocations: feeding a stream slice by slice
/// produces exactly the bytes of one whole-buffer application.
pub(crate) struct XorPad {
    pad: [u8; PAD_SIZE],
    offset: usize,
}

impl XorPad {
    pub(crate) fn new(pad: [u8; PAD_SIZE]) -> Self {
        Self { pad, offset: 0 }
    }

    pub(crate) fn apply(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.pad[self.offset];
            self.offset = (self.offset + 1) % PAD_SIZE;
        }
    }
}

/// Encrypt one chunk body: AES-256-CFB, then the pad XOR.
pub(crate) fn encrypt_chunk(data: Bytes, keys: &ChunkKeys) -> Bytes {
    let mut buf = BytesMut::from(&data[..]);
    Aes256CfbEnc::new((&keys.key).into(), (&keys.iv).into()).encrypt(&mut buf);
    XorPad::new(keys.pad).apply(&mut buf);
    buf.freeze()
}

/// Reverse of [`encrypt_chunk`]: undo the pad XOR, then AES-256-CFB.
pub(crate) fn decrypt_chunk(data: Bytes, keys: &ChunkKeys) -> Bytes {
    let mut buf = BytesMut::from(&data[..]);
    XorPad::new(keys.pad).apply(&mut buf);
    Aes256CfbDec::new((&keys.key).into(), (&keys.iv).into()).decrypt(&mut buf);
    buf.freeze()
}
