//! Periodic shard relocation.
//!
//! Shards sit at fixed filesystem locations between writes, which lets an
//! attacker with repeated raw-disk access correlate allocations over time.
//! The shuffler periodically picks a random sample of shards from external
//! metadata and rewrites each one in place: copy to a temporary sibling,
//! then atomically rename over the original. Byte content is unchanged;
//! each pass only gives the sampled shards a fresh allocation and mtime.
//!
//! Copy-then-rename means a concurrent reader of the same shard observes
//! either the old or the fully written new file, never a partial one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::store::BlobStore;

/// Seam to the external shard metadata.
///
/// The blob store tracks no shard ownership; which files are shards of
/// which document lives in the metadata layer above. The shuffler only
/// needs a random sample of shard paths per pass.
#[async_trait]
pub trait ShardIndex: Send + Sync {
    /// Select up to `count` shard paths at random.
    async fn sample(&self, count: usize) -> Result<Vec<PathBuf>>;
}

/// Maintenance task relocating a random sample of shard files in place.
pub struct ShardShuffler {
    store: BlobStore,
    index: Arc<dyn ShardIndex>,
}

impl ShardShuffler {
    /// Create a shuffler over the given store and shard metadata seam.
    pub fn new(store: BlobStore, index: Arc<dyn ShardIndex>) -> Self {
        Self { store, index }
    }

    /// Run one shuffle pass over `sample_size` randomly chosen shards.
    ///
    /// Returns the number of shards relocated. The first relocation
    /// failure propagates; retry policy belongs to the caller.
    pub async fn run(&self, sample_size: usize) -> Result<usize> {
        let shards = self.index.sample(sample_size).await?;
        for path in &shards {
            self.relocate(path).await?;
        }
        info!(count = shards.len(), "shard shuffle pass complete");
        Ok(shards.len())
    }

    /// Rewrite one shard in place via a temporary sibling.
    ///
    /// The temporary lives in the shard's own directory so the final
    /// rename stays on one volume and is atomic.
    async fn relocate(&self, path: &Path) -> Result<()> {
        let tmp_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => format!("{}.reloc-{}", name, Uuid::new_v4()),
            None => format!("reloc-{}", Uuid::new_v4()),
        };
        let tmp = path.with_file_name(tmp_name);

        let outcome = match self.store.copy(path, &tmp).await {
            Ok(()) => self.store.rename(&tmp, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            // The temporary may hold anything up to a full shard copy; shred
            // it, since nothing in external metadata tracks it
            if let Err(cleanup) = self.store.delete(&tmp).await {
                warn!(path = %tmp.display(), error = %cleanup, "failed to remove relocation temp");
            }
            return Err(e);
        }

        debug!(path = %path.display(), "shard relocated");
        Ok(())
    }

    /// Run shuffle passes forever on a fixed period.
    ///
    /// Pass failures are logged and the loop continues; callers stop the
    /// loop by dropping the spawned task.
    pub async fn run_periodic(self, period: Duration, sample_size: usize) {
        let mut ticker = interval(period);
        ticker.tick().await; // Skip first immediate tick

        loop {
            ticker.tick().await;
            if let Err(e) = self.run(sample_size).await {
                warn!(error = %e, "shard shuffle pass failed");
            }
        }
    }
}
