//! Cryptographic envelope layer for stored blobs
//!
//! This module provides the encryption foundation for the storage core:
//!
//! - **Envelope encryption**: ChaCha20-Poly1305 AEAD with a per-envelope
//!   random salt and nonce, keyed through PBKDF2-HMAC-SHA256 from a
//!   caller-supplied pass-phrase
//! - **Keyed digests**: deterministic BLAKE3 digests for equality lookups
//!   over encrypted columns
//! - **Secret provisioning**: the pass-phrase is an injected capability
//!   (`SecretProvider`), never persisted here, and can be rotated or
//!   invalidated at runtime
//!
//! # Envelope format
//!
//! `salt (salt_len bytes) || nonce (12 bytes) || ciphertext + tag (16 bytes)`
//!
//! There is no version tag or length prefix; encryptor and decryptor must
//! agree on `salt_len`. Authentication failure (wrong key, tampered or
//! truncated ciphertext) is a deterministic error, never garbage plaintext.

mod envelope;
mod secret;

pub use envelope::{CryptoError, EnvelopeCodec, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use secret::{MemorySecretProvider, SecretProvider};
