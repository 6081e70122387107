//! Corrupt-store detection: a chunk that is missing, replaced or resized
//! must fail the whole decryption.

mod common;

use common::{random_bytes, small_options};
use selfcrypt::{decrypt, encrypt, DataMap, DecryptError, DiskStore, Error, MemoryStore};

async fn encrypted_fixture(dir: &std::path::Path) -> (DataMap, DiskStore) {
    let store = DiskStore::open(dir.join("chunks")).await.unwrap();
    let data = random_bytes(5 * 1024);
    let map = encrypt(data, &store, &small_options()).await.unwrap();
    assert_eq!(map.chunks.len(), 5);
    (map, store)
}

#[tokio::test]
async fn missing_chunk_fails_with_its_hash() {
    let dir = tempfile::tempdir().unwrap();
    let (map, store) = encrypted_fixture(dir.path()).await;

    let victim = map.chunks[2].hash.clone();
    std::fs::remove_file(store.root().join(victim.to_string())).unwrap();

    match decrypt(&map, &store).await {
        Err(Error::Decrypt(DecryptError::MissingChunks(missing))) => {
            assert_eq!(missing, vec![victim]);
        }
        other => panic!("expected missing chunk error, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn same_size_replacement_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let (map, store) = encrypted_fixture(dir.path()).await;

    let victim = &map.chunks[1];
    let forged = random_bytes(victim.size as usize);
    std::fs::write(store.root().join(victim.hash.to_string()), &forged).unwrap();

    let result = decrypt(&map, &store).await;
    assert!(matches!(
        result,
        Err(Error::Decrypt(DecryptError::ChunkHashMismatch { index: 1 }))
    ));
}

#[tokio::test]
async fn different_size_replacement_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let (map, store) = encrypted_fixture(dir.path()).await;

    let victim = &map.chunks[3];
    let forged = random_bytes(victim.size as usize + 37);
    std::fs::write(store.root().join(victim.hash.to_string()), &forged).unwrap();

    let result = decrypt(&map, &store).await;
    assert!(matches!(
        result,
        Err(Error::Decrypt(DecryptError::ChunkHashMismatch { index: 3 }))
    ));
}

#[tokio::test]
async fn swapped_chunk_files_are_detected() {
    let dir = tempfile::tempdir().unwrap();
    let (map, store) = encrypted_fixture(dir.path()).await;

    // Each blob still digests to some valid address, just not its own.
    let first = store.root().join(map.chunks[0].hash.to_string());
    let second = store.root().join(map.chunks[1].hash.to_string());
    let first_bytes = std::fs::read(&first).unwrap();
    let second_bytes = std::fs::read(&second).unwrap();
    std::fs::write(&first, second_bytes).unwrap();
    std::fs::write(&second, first_bytes).unwrap();

    assert!(matches!(
        decrypt(&map, &store).await,
        Err(Error::Decrypt(DecryptError::ChunkHashMismatch { .. }))
    ));
}

#[tokio::test]
async fn truncated_inline_map_is_detected() {
    let store = MemoryStore::new();
    let data = random_bytes(100);
    let mut map = encrypt(data, &store, &small_options()).await.unwrap();
    assert!(map.chunks.is_empty());

    map.content = map.content.slice(..50);
    assert!(matches!(
        decrypt(&map, &store).await,
        Err(Error::Decrypt(DecryptError::ContentSizeMismatch { .. }))
    ));
}

#[tokio::test]
async fn deleting_all_chunks_empties_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let (map, store) = encrypted_fixture(dir.path()).await;
    assert_eq!(map.chunks.len(), 5);

    selfcrypt::delete_all_chunks(&map, &store).await.unwrap();
    assert!(!selfcrypt::all_chunks_exist(&map, &store).await.unwrap());
    for chunk in &map.chunks {
        assert!(!store.root().join(chunk.hash.to_string()).exists());
    }

    // Deleting again is harmless.
    selfcrypt::delete_all_chunks(&map, &store).await.unwrap();
}
