//! Encrypted, sharded blob storage core for DocVault.
//!
//! Turns arbitrary byte payloads into on-disk artifacts that are encrypted
//! at rest, split into shard files above a size threshold, served back
//! through a bounded LRU cache of decrypted content, and destroyed by
//! secure overwrite. Metadata (which shard belongs to which document),
//! the API layer, and auth live in the surrounding service; this crate
//! only ever sees byte buffers, paths, and a [`config::StoreConfig`].

/** Decrypted LRU cache over the blob store and envelope codec. */
pub mod cache;
/** Tunable parameters, constructed once and passed into components. */
pub mod config;
/**
 * Cryptographic envelope layer.
 *  - Envelope encryption/decryption and typed wrappers
 *  - Keyed digests for encrypted-column lookups
 *  - Secret pass-phrase provisioning and rotation
 */
pub mod crypto;
pub mod error;
/** Periodic shard relocation against disk-forensic correlation. */
pub mod shuffle;
/**
 * Filesystem storage layer.
 *  - Shard size planning
 *  - Chunked async IO, secure delete, split/merge
 */
pub mod store;

pub use error::{Result, StoreError};

pub mod prelude {
    pub use crate::cache::DecryptedCache;
    pub use crate::config::StoreConfig;
    pub use crate::crypto::{
        CryptoError, EnvelopeCodec, MemorySecretProvider, SecretProvider,
    };
    pub use crate::error::{Result, StoreError};
    pub use crate::shuffle::{ShardIndex, ShardShuffler};
    pub use crate::store::{BlobStore, ShardPlanner};
}
