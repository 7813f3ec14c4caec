//! Shared test utilities for storage integration tests
#![allow(dead_code)]

use std::sync::{Arc, Once};

use store::prelude::*;
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Install a fmt subscriber once so `RUST_LOG` works in test runs.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub struct TestEnv {
    pub store: BlobStore,
    pub codec: EnvelopeCodec,
    pub cache: DecryptedCache,
    pub provider: Arc<MemorySecretProvider>,
    pub config: StoreConfig,
    pub temp: TempDir,
}

/// Set up a test environment with a blob store, codec, and cache rooted in
/// a fresh temporary directory.
pub async fn setup_test_env() -> TestEnv {
    setup_with(|_| {}).await
}

/// Set up a test environment with config overrides.
pub async fn setup_with(adjust: impl FnOnce(&mut StoreConfig)) -> TestEnv {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let mut config = StoreConfig::new(temp.path().join("blobs"));
    // Keep tests fast; the production default iteration count is much higher
    config.kdf_iterations = 1_000;
    adjust(&mut config);

    let provider = Arc::new(MemorySecretProvider::new("integration test secret"));
    let store = BlobStore::new(&config).await.unwrap();
    let codec = EnvelopeCodec::new(&config, provider.clone());
    let cache = DecryptedCache::new(&config, store.clone(), codec.clone(), provider.as_ref());

    TestEnv {
        store,
        codec,
        cache,
        provider,
        config,
        temp,
    }
}
