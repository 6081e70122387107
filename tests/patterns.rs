//! Ciphertext identity across repeated-content streams.
//!
//! A chunk's ciphertext is a function of its plaintext and the two
//! predecessor pre-hashes (wrapping at the front), nothing else. Streams
//! built from repeated chunk-sized pieces therefore produce a predictable
//! number of distinct stored blobs.

mod common;

use std::collections::HashSet;

use bytes::{Bytes, BytesMut};
use common::{random_bytes, small_options, small_params};
use selfcrypt::{decrypt, encrypt, MemoryStore};

const PIECE_SIZE: usize = 1024;

fn build_stream(pattern: &str, pieces: &[(char, Bytes)]) -> Bytes {
    let mut data = BytesMut::with_capacity(pattern.len() * PIECE_SIZE);
    for name in pattern.chars() {
        let piece = &pieces
            .iter()
            .find(|(n, _)| *n == name)
            .expect("unknown piece")
            .1;
        data.extend_from_slice(piece);
    }
    data.freeze()
}

#[tokio::test]
async fn unique_blob_counts_match_the_neighbour_rule() {
    let pieces = vec![
        ('A', random_bytes(PIECE_SIZE)),
        ('B', random_bytes(PIECE_SIZE)),
        ('C', random_bytes(PIECE_SIZE)),
    ];
    let expectations = [
        ("AAA", 1),
        ("ABC", 3),
        ("AAAB", 4),
        ("BAAAA", 4),
        ("AABAA", 4),
        ("BAAAB", 5),
        ("AAABC", 5),
        ("AABAAB", 3),
        ("AABAAC", 6),
        ("AABAACAAC", 6),
        ("AABAACAAB", 6),
        ("ABACA", 5),
    ];

    for (pattern, expected) in expectations {
        let store = MemoryStore::new();
        let data = build_stream(pattern, &pieces);
        let map = encrypt(data.clone(), &store, &small_options()).await.unwrap();

        assert_eq!(map.chunks.len(), pattern.len(), "pattern {}", pattern);
        let unique: HashSet<_> = map.chunks.iter().map(|c| c.hash.clone()).collect();
        assert_eq!(unique.len(), expected, "pattern {}", pattern);
        assert_eq!(store.len().await, expected, "pattern {}", pattern);

        assert_eq!(decrypt(&map, &store).await.unwrap(), data, "pattern {}", pattern);
    }
}

#[tokio::test]
async fn repeated_content_stores_one_blob() {
    let repeats = 7;
    let piece = random_bytes(small_params().max_chunk_size);
    let mut data = BytesMut::with_capacity(repeats * piece.len());
    for _ in 0..repeats {
        data.extend_from_slice(&piece);
    }
    let data = data.freeze();

    let store = MemoryStore::new();
    let map = encrypt(data.clone(), &store, &small_options()).await.unwrap();

    assert_eq!(map.chunks.len(), repeats);
    let first = &map.chunks[0];
    assert!(map.chunks.iter().all(|c| c.hash == first.hash));
    assert!(map.chunks.iter().all(|c| c.pre_hash == first.pre_hash));
    assert_eq!(store.len().await, 1);

    assert_eq!(decrypt(&map, &store).await.unwrap(), data);
}

#[tokio::test]
async fn identical_streams_deduplicate_across_maps() {
    let store = MemoryStore::new();
    let data = random_bytes(4 * small_params().max_chunk_size);

    let first = encrypt(data.clone(), &store, &small_options()).await.unwrap();
    let occupied = store.len().await;
    let second = encrypt(data, &store, &small_options()).await.unwrap();

    assert_eq!(store.len().await, occupied);
    for (a, b) in first.chunks.iter().zip(&second.chunks) {
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.pre_hash, b.pre_hash);
    }
}
