//! Bounded LRU cache of decrypted blob contents.
//!
//! Retrieval handlers go through [`DecryptedCache`] instead of hitting the
//! blob store directly: a hit returns plaintext without disk IO or key
//! derivation, a miss reads and decrypts through the store and codec, then
//! caches the result. The cache holds plaintext exclusively in memory and
//! has no authority over on-disk truth; it registers an invalidation hook
//! with the secret provider so rotation drops every entry.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::StoreConfig;
use crate::crypto::{EnvelopeCodec, SecretProvider};
use crate::error::{Result, StoreError};
use crate::store::BlobStore;

/// LRU bookkeeping: `order` runs from least to most recently used.
#[derive(Default)]
struct LruState {
    entries: HashMap<PathBuf, Bytes>,
    order: VecDeque<PathBuf>,
}

impl LruState {
    /// Move an existing entry to the most-recently-used end.
    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.order.iter().position(|p| p == path) {
            if let Some(entry) = self.order.remove(pos) {
                self.order.push_back(entry);
            }
        }
    }

    /// Insert as most-recently-used, evicting from the LRU end while at
    /// capacity.
    fn insert(&mut self, path: PathBuf, data: Bytes, capacity: usize) {
        if self.entries.contains_key(&path) {
            // Concurrent miss on the same key already populated it
            self.touch(&path);
            return;
        }
        while self.entries.len() >= capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
                debug!(path = %evicted.display(), "cache entry evicted");
            } else {
                break;
            }
        }
        self.order.push_back(path.clone());
        self.entries.insert(path, data);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

struct CacheInner {
    store: BlobStore,
    codec: EnvelopeCodec,
    capacity: usize,
    max_item_bytes: usize,
    state: Mutex<LruState>,
}

/// Capacity-bounded in-memory map of storage path to decrypted contents.
///
/// Eviction is strict LRU: hits and inserts both move an entry to the
/// most-recently-used end, and the resident entry count never exceeds the
/// configured capacity. One mutex owns the whole state, so evictions are
/// serialized; two concurrent misses of the same key may both read disk,
/// but only one insert wins.
///
/// Decrypted buffers larger than the configured per-item limit are still
/// returned to the caller but bypass the cache.
#[derive(Clone)]
pub struct DecryptedCache {
    inner: Arc<CacheInner>,
}

impl DecryptedCache {
    /// Create a cache over the given store and codec, subscribed to the
    /// secret provider so rotation or invalidation clears it.
    pub fn new(
        config: &StoreConfig,
        store: BlobStore,
        codec: EnvelopeCodec,
        provider: &dyn SecretProvider,
    ) -> Self {
        let inner = Arc::new(CacheInner {
            store,
            codec,
            capacity: config.cache_capacity,
            max_item_bytes: config.cache_max_item_bytes,
            state: Mutex::new(LruState::default()),
        });

        // Plaintext derived from the old secret must not outlive it
        let weak = Arc::downgrade(&inner);
        provider.on_invalidate(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.state.lock().clear();
            }
        }));

        Self { inner }
    }

    /// Load the decrypted contents of `path`.
    ///
    /// - Resident entry: marked most-recently-used and returned without
    ///   touching disk.
    /// - Path absent on disk: `Ok(None)` immediately; negative results are
    ///   never cached.
    /// - Otherwise: read through the blob store, decrypt through the
    ///   codec, insert as most-recently-used (evicting the LRU entry while
    ///   at capacity), and return the plaintext.
    ///
    /// # Errors
    ///
    /// Propagates read failures other than absence, and every decryption
    /// failure: a wrong or missing secret is an error here, never a miss.
    pub async fn load(&self, path: &Path) -> Result<Option<Bytes>> {
        {
            let mut state = self.inner.state.lock();
            if let Some(hit) = state.entries.get(path).cloned() {
                state.touch(path);
                return Ok(Some(hit));
            }
        }

        if !self.inner.store.exists(path).await? {
            return Ok(None);
        }
        let raw = match self.inner.store.read(path).await {
            Ok(raw) => raw,
            // Deleted between the existence check and the read
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let plaintext = Bytes::from(self.inner.codec.decrypt_bytes(&raw)?);

        if plaintext.len() > self.inner.max_item_bytes {
            debug!(
                path = %path.display(),
                bytes = plaintext.len(),
                "decrypted entry exceeds per-item limit, bypassing cache"
            );
            return Ok(Some(plaintext));
        }

        self.inner
            .state
            .lock()
            .insert(path.to_path_buf(), plaintext.clone(), self.inner.capacity);
        Ok(Some(plaintext))
    }

    /// Drop every cached entry.
    ///
    /// Wired to secret rotation and invalidation; also callable directly.
    pub fn clear(&self) {
        self.inner.state.lock().clear();
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `path` is resident, without affecting recency.
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.state.lock().entries.contains_key(path)
    }
}
