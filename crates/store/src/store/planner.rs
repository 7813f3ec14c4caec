//! Shard sizing decisions.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// A candidate size is only promoted once the payload fills at least this
/// many shards of it.
pub const SPLIT_FACTOR: u64 = 4;

/// Pure sizing algorithm choosing a shard size for a given payload length.
///
/// The planner holds an ascending table of power-of-two candidate sizes.
/// Payloads below the smallest candidate are stored whole.
/// [`plan`](Self::plan) otherwise keeps the largest candidate `s` with
/// `SPLIT_FACTOR * s <= total_len`, falling back to the smallest candidate
/// when no entry qualifies. Very large payloads cap at the largest
/// candidate and the shard count grows instead.
#[derive(Debug, Clone)]
pub struct ShardPlanner {
    table: Vec<u64>,
}

impl ShardPlanner {
    /// Build the candidate table from the configured bounds.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let mut table = Vec::new();
        let mut size = config.min_shard_bytes;
        while size <= config.max_shard_bytes {
            table.push(size);
            size *= 2;
        }
        Ok(Self { table })
    }

    /// Build a planner from an explicit candidate table.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` if the table is empty, not
    /// strictly ascending, or contains a non-power-of-two entry.
    pub fn from_table(table: Vec<u64>) -> Result<Self> {
        if table.is_empty() {
            return Err(StoreError::InvalidConfig(
                "shard size table must not be empty".into(),
            ));
        }
        for window in table.windows(2) {
            if window[0] >= window[1] {
                return Err(StoreError::InvalidConfig(
                    "shard size table must be strictly ascending".into(),
                ));
            }
        }
        if let Some(&bad) = table.iter().find(|s| !s.is_power_of_two()) {
            return Err(StoreError::InvalidConfig(format!(
                "shard size {bad} is not a power of two"
            )));
        }
        Ok(Self { table })
    }

    /// Choose a shard size for a payload of `total_len` bytes.
    ///
    /// Returns `None` when the payload should be stored as a single file.
    pub fn plan(&self, total_len: u64) -> Option<u64> {
        if total_len < self.table[0] {
            return None;
        }
        let mut chosen = self.table[0];
        for &size in &self.table {
            if size.saturating_mul(SPLIT_FACTOR) <= total_len {
                chosen = size;
            } else {
                break;
            }
        }
        Some(chosen)
    }

    /// Smallest candidate size in the table.
    pub fn min_shard_bytes(&self) -> u64 {
        self.table[0]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn planner() -> ShardPlanner {
        ShardPlanner::new(&StoreConfig::new("/tmp/unused")).unwrap()
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let planner = planner();
        // Exactly four 2 KiB shards
        assert_eq!(planner.plan(4 * 2048), Some(2048));
        assert_eq!(planner.plan(4 * 2048 - 1), Some(1024));
    }

    #[test]
    fn test_below_smallest_candidate_stores_whole() {
        let planner = planner();
        assert_eq!(planner.plan(0), None);
        assert_eq!(planner.plan(1023), None);
    }

    #[test]
    fn test_smallest_candidate_is_the_floor() {
        let planner = planner();
        // No entry satisfies 4*s <= len yet, but the payload already
        // reaches the smallest candidate
        assert_eq!(planner.plan(1024), Some(1024));
        assert_eq!(planner.plan(4 * 1024 - 1), Some(1024));
    }

    #[test]
    fn test_picks_largest_qualifying_size() {
        let planner = planner();
        assert_eq!(planner.plan(8 * 1024), Some(2048));
        assert_eq!(planner.plan(8 * 1024 - 1), Some(1024));
    }

    #[test]
    fn test_large_payloads_cap_at_table_max() {
        let planner =
            ShardPlanner::from_table(vec![1024, 2048, 4096]).unwrap();
        // Way past the largest entry: shard count grows, size does not
        assert_eq!(planner.plan(1 << 30), Some(4096));
    }

    #[test]
    fn test_sparse_table() {
        // A table skipping 2048: payloads in the gap fall back to 1 KiB
        let planner = ShardPlanner::from_table(vec![1024, 4096]).unwrap();
        assert_eq!(planner.plan(10_044), Some(1024));
        assert_eq!(planner.plan(4 * 4096), Some(4096));
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(ShardPlanner::from_table(vec![]).is_err());
        assert!(ShardPlanner::from_table(vec![2048, 1024]).is_err());
        assert!(ShardPlanner::from_table(vec![1000]).is_err());
    }
}
