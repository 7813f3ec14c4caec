//! End-to-end upload/retrieve/destroy scenarios across the codec, planner,
//! blob store, and cache.

mod common;

use std::path::PathBuf;

use store::crypto::{NONCE_SIZE, TAG_SIZE};
use store::prelude::*;

const PAYLOAD_LEN: usize = 10_000;

fn payload() -> Vec<u8> {
    (0..PAYLOAD_LEN as u32).map(|i| (i % 249) as u8).collect()
}

#[tokio::test]
async fn test_envelope_length_is_deterministic() {
    let env = common::setup_test_env().await;

    let envelope = env.codec.encrypt_bytes(&payload()).unwrap();
    assert_eq!(
        envelope.len(),
        env.config.salt_len + NONCE_SIZE + PAYLOAD_LEN + TAG_SIZE
    );
}

#[tokio::test]
async fn test_upload_retrieve_roundtrip() {
    let env = common::setup_test_env().await;
    let data = payload();

    // Upload: encrypt, then split into shards
    let envelope = env.codec.encrypt_bytes(&data).unwrap();
    let names = env.store.split(&envelope).await.unwrap();

    // 10,044-byte envelope: plan picks 2 KiB, so five shards
    let shard_size = env
        .store
        .planner()
        .plan(envelope.len() as u64)
        .unwrap();
    assert_eq!(shard_size, 2048);
    assert_eq!(names.len(), envelope.len().div_ceil(shard_size as usize));

    for name in &names {
        assert!(env.store.exists(&env.store.path_for(name)).await.unwrap());
    }

    // Retrieve: merge shards in order, then decrypt
    let paths: Vec<PathBuf> = names.iter().map(|n| env.store.path_for(n)).collect();
    let merged = env.store.merge(&paths).await.unwrap();
    assert_eq!(merged, envelope);
    assert_eq!(env.codec.decrypt_bytes(&merged).unwrap(), data);
}

#[tokio::test]
async fn test_sparse_table_picks_smaller_shards() {
    // A table whose entries around the envelope length are 1 KiB and
    // 4 KiB: the envelope sits in 4*1024 <= len < 4*4096, so shards are
    // 1 KiB and the count grows accordingly.
    let env = common::setup_test_env().await;
    let planner = ShardPlanner::from_table(vec![1024, 4096, 16_384]).unwrap();
    let mut config = env.config.clone();
    config.data_dir = env.temp.path().join("sparse");
    let store = BlobStore::with_planner(&config, planner).await.unwrap();

    let data = payload();
    let envelope = env.codec.encrypt_bytes(&data).unwrap();
    assert_eq!(store.planner().plan(envelope.len() as u64), Some(1024));

    let names = store.split(&envelope).await.unwrap();
    assert_eq!(names.len(), envelope.len().div_ceil(1024));

    let paths: Vec<PathBuf> = names.iter().map(|n| store.path_for(n)).collect();
    let merged = store.merge(&paths).await.unwrap();
    assert_eq!(env.codec.decrypt_bytes(&merged).unwrap(), data);
}

#[tokio::test]
async fn test_small_payload_stays_whole_and_cached_retrieval_works() {
    let env = common::setup_test_env().await;
    let data = b"short document body".to_vec();

    let envelope = env.codec.encrypt_bytes(&data).unwrap();
    let names = env.store.split(&envelope).await.unwrap();
    assert_eq!(names.len(), 1);

    // Single-file artifacts go through the decrypted cache
    let path = env.store.path_for(&names[0]);
    let first = env.cache.load(&path).await.unwrap().unwrap();
    assert_eq!(first.as_ref(), data.as_slice());

    // Second load is a hit: survives deletion of the backing file
    env.store.delete(&path).await.unwrap();
    let second = env.cache.load(&path).await.unwrap().unwrap();
    assert_eq!(second.as_ref(), data.as_slice());
}

#[tokio::test]
async fn test_destroy_is_unrecoverable_by_path() {
    let env = common::setup_test_env().await;

    let envelope = env.codec.encrypt_bytes(&payload()).unwrap();
    let names = env.store.split(&envelope).await.unwrap();

    for name in &names {
        env.store.delete(&env.store.path_for(name)).await.unwrap();
    }
    for name in &names {
        let path = env.store.path_for(name);
        assert!(!env.store.exists(&path).await.unwrap());
        assert!(matches!(
            env.store.read(&path).await,
            Err(StoreError::NotFound(_))
        ));
    }

    // Destroying again is a no-op, not an error
    for name in &names {
        env.store.delete(&env.store.path_for(name)).await.unwrap();
    }
}

#[tokio::test]
async fn test_shuffle_pass_keeps_artifacts_readable() {
    let env = common::setup_test_env().await;
    let data = payload();

    let envelope = env.codec.encrypt_bytes(&data).unwrap();
    let names = env.store.split(&envelope).await.unwrap();
    let paths: Vec<PathBuf> = names.iter().map(|n| env.store.path_for(n)).collect();

    struct AllShards(Vec<PathBuf>);

    #[async_trait::async_trait]
    impl ShardIndex for AllShards {
        async fn sample(&self, count: usize) -> Result<Vec<PathBuf>> {
            Ok(self.0.iter().take(count).cloned().collect())
        }
    }

    let shuffler = ShardShuffler::new(
        env.store.clone(),
        std::sync::Arc::new(AllShards(paths.clone())),
    );
    shuffler.run(paths.len()).await.unwrap();

    let merged = env.store.merge(&paths).await.unwrap();
    assert_eq!(env.codec.decrypt_bytes(&merged).unwrap(), data);
}
