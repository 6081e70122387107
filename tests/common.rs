#![allow(dead_code)]

use bytes::Bytes;
use rand::Rng;
use selfcrypt::{EncryptOptions, SelfEncryptionParams};

pub fn random_bytes(byte_count: usize) -> Bytes {
    let mut data = vec![0u8; byte_count];
    rand::thread_rng().fill(&mut data[..]);
    Bytes::from(data)
}

/// Parameters scaled down for fast chunk-level tests.
pub fn small_params() -> SelfEncryptionParams {
    SelfEncryptionParams::new(1024, 256, 1024)
}

pub fn small_options() -> EncryptOptions {
    EncryptOptions {
        params: small_params(),
        ..EncryptOptions::default()
    }
}
