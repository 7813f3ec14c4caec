//! Envelope encryption and keyed digests using ChaCha20-Poly1305.

use std::sync::Arc;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use super::secret::SecretProvider;
use crate::config::StoreConfig;

/// Size of the ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the derived symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Domain-separation context for column digest keys
const DIGEST_KEY_CONTEXT: &str = "docvault-store v1 column digest key";

/// Errors that can occur during envelope encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The pass-phrase has been invalidated and not replaced
    #[error("no secret available: the pass-phrase has been invalidated")]
    MissingSecret,

    /// Envelope too short to carry a salt, nonce, and tag
    #[error("malformed envelope: {0}")]
    Malformed(&'static str),

    /// AEAD open failure: wrong key, tampered or truncated ciphertext
    #[error("authentication failed: wrong key or tampered ciphertext")]
    Authentication,

    /// AEAD seal failure
    #[error("cipher failure during encryption")]
    Cipher,

    /// Typed wrapper decode failure
    #[error("decrypted value failed to parse: {0}")]
    Parse(String),

    /// System random source failure
    #[error("random source failure: {0}")]
    Random(String),
}

/// Symmetric envelope codec for blob payloads and metadata columns.
///
/// Every `encrypt` call generates a fresh random salt and nonce, derives a
/// 256-bit key from the current pass-phrase with PBKDF2-HMAC-SHA256, and
/// seals the payload with ChaCha20-Poly1305. The output envelope is
/// `salt || nonce || ciphertext + tag` and is self-describing given the
/// configured salt length.
///
/// All operations are null-preserving: `None` in, `Ok(None)` out. This
/// mirrors nullable encrypted columns in the metadata layer above.
///
/// No IO happens here; the secret comes from the injected
/// [`SecretProvider`] and is never stored on the codec.
#[derive(Clone)]
pub struct EnvelopeCodec {
    salt_len: usize,
    kdf_iterations: u32,
    provider: Arc<dyn SecretProvider>,
}

impl EnvelopeCodec {
    /// Create a codec from configuration and a secret capability.
    pub fn new(config: &StoreConfig, provider: Arc<dyn SecretProvider>) -> Self {
        Self {
            salt_len: config.salt_len,
            kdf_iterations: config.kdf_iterations,
            provider,
        }
    }

    /// Derive the symmetric key for a given salt from the current secret.
    fn derive_key(&self, salt: &[u8]) -> Result<Key, CryptoError> {
        let secret = self.provider.current()?;
        let mut key = [0u8; KEY_SIZE];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, self.kdf_iterations, &mut key);
        Ok(Key::from(key))
    }

    /// Encrypt a byte buffer into a fresh envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if no secret is available or the system random
    /// source fails.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut salt = vec![0u8; self.salt_len];
        getrandom::getrandom(&mut salt).map_err(|e| CryptoError::Random(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| CryptoError::Random(e.to_string()))?;
        let nonce = Nonce::from(nonce_bytes);

        let key = self.derive_key(&salt)?;
        let cipher = ChaCha20Poly1305::new(&key);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::Cipher)?;

        let mut out = Vec::with_capacity(self.salt_len + NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt an envelope produced by [`encrypt_bytes`](Self::encrypt_bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No secret is available
    /// - The envelope is too short to carry `salt || nonce || tag`
    /// - Authentication fails (wrong key, tampered or truncated ciphertext)
    pub fn decrypt_bytes(&self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if envelope.len() < self.salt_len + NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Malformed("envelope too short"));
        }

        let (salt, rest) = envelope.split_at(self.salt_len);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        let key = self.derive_key(salt)?;
        let cipher = ChaCha20Poly1305::new(&key);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::Authentication)
    }

    /// Encrypt an optional byte buffer, preserving `None`.
    pub fn encrypt(&self, data: Option<&[u8]>) -> Result<Option<Vec<u8>>, CryptoError> {
        data.map(|d| self.encrypt_bytes(d)).transpose()
    }

    /// Decrypt an optional envelope, preserving `None`.
    pub fn decrypt(&self, envelope: Option<&[u8]>) -> Result<Option<Vec<u8>>, CryptoError> {
        envelope.map(|e| self.decrypt_bytes(e)).transpose()
    }

    /// Encrypt an optional string.
    pub fn encrypt_str(&self, value: Option<&str>) -> Result<Option<Vec<u8>>, CryptoError> {
        self.encrypt(value.map(str::as_bytes))
    }

    /// Decrypt an optional string envelope.
    ///
    /// # Errors
    ///
    /// In addition to [`decrypt`](Self::decrypt) errors, fails with
    /// `CryptoError::Parse` if the plaintext is not valid UTF-8.
    pub fn decrypt_str(&self, envelope: Option<&[u8]>) -> Result<Option<String>, CryptoError> {
        self.decrypt(envelope)?
            .map(|bytes| String::from_utf8(bytes).map_err(|e| CryptoError::Parse(e.to_string())))
            .transpose()
    }

    /// Encrypt an optional integer via its decimal encoding.
    pub fn encrypt_i64(&self, value: Option<i64>) -> Result<Option<Vec<u8>>, CryptoError> {
        match value {
            Some(v) => self.encrypt_str(Some(&v.to_string())),
            None => Ok(None),
        }
    }

    /// Decrypt an optional integer envelope.
    pub fn decrypt_i64(&self, envelope: Option<&[u8]>) -> Result<Option<i64>, CryptoError> {
        self.decrypt_str(envelope)?
            .map(|s| s.parse::<i64>().map_err(|e| CryptoError::Parse(e.to_string())))
            .transpose()
    }

    /// Encrypt an optional boolean via its textual encoding.
    pub fn encrypt_bool(&self, value: Option<bool>) -> Result<Option<Vec<u8>>, CryptoError> {
        match value {
            Some(v) => self.encrypt_str(Some(if v { "true" } else { "false" })),
            None => Ok(None),
        }
    }

    /// Decrypt an optional boolean envelope.
    pub fn decrypt_bool(&self, envelope: Option<&[u8]>) -> Result<Option<bool>, CryptoError> {
        self.decrypt_str(envelope)?
            .map(|s| match s.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(CryptoError::Parse(format!("not a boolean: {other}"))),
            })
            .transpose()
    }

    /// Deterministic keyed digest of a value for equality lookups.
    ///
    /// The digest key is derived from the current secret, so equal values
    /// hash equally under one secret and the digest reveals nothing without
    /// it. Used by the metadata layer to index encrypted columns.
    pub fn hash(&self, value: Option<&str>) -> Result<Option<String>, CryptoError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let secret = self.provider.current()?;
        let key = blake3::derive_key(DIGEST_KEY_CONTEXT, secret.as_bytes());
        let digest = blake3::keyed_hash(&key, value.as_bytes());
        Ok(Some(hex::encode(digest.as_bytes())))
    }
}

impl std::fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("salt_len", &self.salt_len)
            .field("kdf_iterations", &self.kdf_iterations)
            .finish()
    }
}
