//! Filesystem storage layer
//!
//! [`ShardPlanner`] is the pure sizing decision: given a payload length it
//! picks a shard size from an ordered power-of-two table, or declines to
//! split. [`BlobStore`] is the only component in the crate that touches the
//! filesystem: chunked async read/write/copy, atomic rename, secure
//! overwrite-then-unlink deletion, and split/merge built on the planner.
//!
//! Shard filenames are random UUIDs with no embedded semantics; the mapping
//! from logical documents to shard filenames lives in external metadata.

mod blob;
mod planner;

pub use blob::BlobStore;
pub use planner::{ShardPlanner, SPLIT_FACTOR};
