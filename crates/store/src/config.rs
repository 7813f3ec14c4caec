//! Tunable parameters for the storage core.
//!
//! A `StoreConfig` is constructed once by the surrounding service and passed
//! by reference into each component's constructor. There is no ambient
//! global configuration state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

fn default_salt_len() -> usize {
    16
}

fn default_kdf_iterations() -> u32 {
    600_000
}

fn default_min_shard_bytes() -> u64 {
    1024
}

fn default_max_shard_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_cache_capacity() -> usize {
    64
}

fn default_cache_max_item_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_shred_cycles() -> u32 {
    3
}

fn default_io_chunk_bytes() -> usize {
    64 * 1024
}

/// Configuration for the storage core.
///
/// All fields except `data_dir` have serde defaults, so a deployment only
/// has to name the base directory. Changing `salt_len` invalidates every
/// previously written envelope: the wire format carries no version tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base directory for stored artifacts
    pub data_dir: PathBuf,

    /// Length in bytes of the per-envelope random KDF salt
    #[serde(default = "default_salt_len")]
    pub salt_len: usize,

    /// PBKDF2 iteration count for key derivation
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Smallest shard size candidate (power of two)
    #[serde(default = "default_min_shard_bytes")]
    pub min_shard_bytes: u64,

    /// Largest shard size candidate (power of two)
    #[serde(default = "default_max_shard_bytes")]
    pub max_shard_bytes: u64,

    /// Maximum number of resident decrypted cache entries
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Decrypted buffers larger than this bypass the cache
    #[serde(default = "default_cache_max_item_bytes")]
    pub cache_max_item_bytes: usize,

    /// Number of random-overwrite passes performed by secure delete
    #[serde(default = "default_shred_cycles")]
    pub shred_cycles: u32,

    /// Chunk size for streaming file IO
    #[serde(default = "default_io_chunk_bytes")]
    pub io_chunk_bytes: usize,
}

impl StoreConfig {
    /// Create a configuration with defaults for everything but the base directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            salt_len: default_salt_len(),
            kdf_iterations: default_kdf_iterations(),
            min_shard_bytes: default_min_shard_bytes(),
            max_shard_bytes: default_max_shard_bytes(),
            cache_capacity: default_cache_capacity(),
            cache_max_item_bytes: default_cache_max_item_bytes(),
            shred_cycles: default_shred_cycles(),
            io_chunk_bytes: default_io_chunk_bytes(),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` if any field is out of range:
    /// zero salt length, zero KDF iterations, shard bounds that are not
    /// ascending powers of two, a zero cache capacity, or a zero IO chunk
    /// size.
    pub fn validate(&self) -> Result<()> {
        if self.salt_len == 0 {
            return Err(StoreError::InvalidConfig("salt_len must be non-zero".into()));
        }
        if self.kdf_iterations == 0 {
            return Err(StoreError::InvalidConfig(
                "kdf_iterations must be non-zero".into(),
            ));
        }
        if !self.min_shard_bytes.is_power_of_two() || !self.max_shard_bytes.is_power_of_two() {
            return Err(StoreError::InvalidConfig(
                "shard size bounds must be powers of two".into(),
            ));
        }
        if self.min_shard_bytes > self.max_shard_bytes {
            return Err(StoreError::InvalidConfig(
                "min_shard_bytes must not exceed max_shard_bytes".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(StoreError::InvalidConfig(
                "cache_capacity must be non-zero".into(),
            ));
        }
        if self.io_chunk_bytes == 0 {
            return Err(StoreError::InvalidConfig(
                "io_chunk_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StoreConfig::new("/tmp/blobs");
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_non_power_of_two_shard_bounds() {
        let mut config = StoreConfig::new("/tmp/blobs");
        config.min_shard_bytes = 1000;
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_shard_bounds() {
        let mut config = StoreConfig::new("/tmp/blobs");
        config.min_shard_bytes = 4096;
        config.max_shard_bytes = 1024;
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_cache_capacity() {
        let mut config = StoreConfig::new("/tmp/blobs");
        config.cache_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));
    }
}
