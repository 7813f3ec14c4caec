//! Chunked async file IO, secure deletion, and shard split/merge.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::planner::ShardPlanner;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Filesystem blob store.
///
/// All IO is chunked and non-blocking. The store owns a base directory;
/// shard filenames generated by [`split`](Self::split) are random UUIDs
/// resolved under it via [`path_for`](Self::path_for). The other
/// operations take explicit paths so callers can address shards recorded
/// in external metadata.
///
/// Correctness under concurrency relies on atomic same-volume renames and
/// collision-free filenames, not locks.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    chunk_bytes: usize,
    shred_cycles: u32,
    planner: ShardPlanner,
}

impl BlobStore {
    /// Create a blob store rooted at the configured base directory.
    ///
    /// Validates the configuration and creates the directory if needed.
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        let planner = ShardPlanner::new(config)?;
        Self::with_planner(config, planner).await
    }

    /// Create a blob store with an explicit shard planner.
    pub async fn with_planner(config: &StoreConfig, planner: ShardPlanner) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir).await?;
        Ok(Self {
            root: config.data_dir.clone(),
            chunk_bytes: config.io_chunk_bytes,
            shred_cycles: config.shred_cycles,
            planner,
        })
    }

    /// Base directory for stored artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The shard planner in use.
    pub fn planner(&self) -> &ShardPlanner {
        &self.planner
    }

    /// Resolve a shard filename under the base directory.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write a whole buffer to `path` in fixed-size chunks.
    ///
    /// The file is flushed and synced before this returns.
    pub async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = fs::File::create(path).await?;
        for chunk in data.chunks(self.chunk_bytes) {
            file.write_all(chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Read a whole file from `path` in fixed-size chunks.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the path does not exist.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut out = match file.metadata().await {
            Ok(meta) => Vec::with_capacity(meta.len() as usize),
            Err(_) => Vec::new(),
        };
        let mut buf = vec![0u8; self.chunk_bytes];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        Ok(out)
    }

    /// Check whether `path` exists.
    pub async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(path).await?)
    }

    /// Copy `src` to `dst`, streaming fixed-size chunks.
    ///
    /// The destination is flushed and synced before this returns.
    pub async fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        let mut from = match fs::File::open(src).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(src.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut to = fs::File::create(dst).await?;

        let mut buf = vec![0u8; self.chunk_bytes];
        loop {
            let n = from.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            to.write_all(&buf[..n]).await?;
        }
        to.flush().await?;
        to.sync_all().await?;
        Ok(())
    }

    /// Atomically rename `src` to `dst` on the same volume.
    pub async fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        fs::rename(src, dst).await?;
        Ok(())
    }

    /// Securely delete `path`: overwrite with fresh random bytes for the
    /// configured number of cycles, sync each pass, then unlink.
    ///
    /// Deleting an absent path is a no-op. This is the only delete
    /// primitive; content is unrecoverable afterward.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        let len = match fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if len > 0 && self.shred_cycles > 0 {
            let mut file = fs::OpenOptions::new().write(true).open(path).await?;
            let mut buf = vec![0u8; self.chunk_bytes];
            for _ in 0..self.shred_cycles {
                file.seek(SeekFrom::Start(0)).await?;
                let mut remaining = len;
                while remaining > 0 {
                    let n = remaining.min(buf.len() as u64) as usize;
                    getrandom::getrandom(&mut buf[..n]).map_err(|e| {
                        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
                    })?;
                    file.write_all(&buf[..n]).await?;
                    remaining -= n as u64;
                }
                file.sync_all().await?;
            }
        }

        fs::remove_file(path).await?;
        debug!(path = %path.display(), cycles = self.shred_cycles, "blob shredded");
        Ok(())
    }

    /// Split `data` into shard files under the base directory.
    ///
    /// The planner picks the shard size; below its threshold the whole
    /// buffer is written under one fresh filename. Otherwise the buffer is
    /// partitioned into contiguous chunks (the last holds the remainder),
    /// each written under a fresh filename, and the filenames are returned
    /// in order once every shard is fully written and closed.
    ///
    /// All-or-nothing: if any shard write fails, every shard already
    /// written in this call is securely deleted before the error
    /// propagates.
    pub async fn split(&self, data: &[u8]) -> Result<Vec<String>> {
        self.split_with(data, || Uuid::new_v4().to_string()).await
    }

    /// Split with a caller-supplied source of fresh shard filenames.
    async fn split_with(
        &self,
        data: &[u8],
        mut next_name: impl FnMut() -> String,
    ) -> Result<Vec<String>> {
        let chunks: Vec<&[u8]> = match self.planner.plan(data.len() as u64) {
            None => vec![data],
            Some(shard_size) => data.chunks(shard_size as usize).collect(),
        };

        let mut written = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let name = next_name();
            if let Err(e) = self.write(&self.path_for(&name), chunk).await {
                warn!(
                    shards_written = written.len(),
                    error = %e,
                    "shard write failed, removing partial output"
                );
                self.remove_partial(&written).await;
                return Err(e);
            }
            written.push(name);
        }

        debug!(
            shards = written.len(),
            bytes = data.len(),
            "payload split"
        );
        Ok(written)
    }

    /// Securely delete shards left behind by a failed `split` call.
    ///
    /// Best effort: the original error is what propagates to the caller.
    async fn remove_partial(&self, names: &[String]) {
        for name in names {
            let path = self.path_for(name);
            if let Err(e) = self.delete(&path).await {
                warn!(path = %path.display(), error = %e, "failed to remove partial shard");
            }
        }
    }

    /// Concatenate the contents of `paths` in caller order.
    ///
    /// Each file is streamed in fixed-size chunks independent of its
    /// original shard size. The first read error propagates with no
    /// partial result.
    pub async fn merge(&self, paths: &[PathBuf]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for path in paths {
            let bytes = self.read(path).await?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }
}
