//! Secret pass-phrase provisioning.
//!
//! The master pass-phrase lives outside this library and may be rotated or
//! invalidated at any time. Components that need it receive a
//! [`SecretProvider`] capability instead of reading ambient state; anything
//! holding material derived from the secret (the decrypted cache) registers
//! an invalidation hook so it is flushed on rotation.

use parking_lot::{Mutex, RwLock};

use super::CryptoError;

type InvalidationHook = Box<dyn Fn() + Send + Sync>;

/// Capability supplying the current encryption pass-phrase.
///
/// Implementations must treat the secret as mutable external state: the
/// value returned by `current` may change between calls, and a rotated or
/// invalidated secret must be observed by subsequent encrypt/decrypt
/// operations immediately.
pub trait SecretProvider: Send + Sync {
    /// Get the current pass-phrase.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MissingSecret` if the secret has been
    /// invalidated and not yet replaced.
    fn current(&self) -> Result<String, CryptoError>;

    /// Register a hook fired whenever the secret is rotated or invalidated.
    ///
    /// Hooks must not call back into the provider.
    fn on_invalidate(&self, hook: InvalidationHook);
}

/// In-memory [`SecretProvider`] with explicit rotation.
///
/// This is the process-local implementation used by the surrounding
/// service: it holds the pass-phrase behind a lock, and `rotate` /
/// `invalidate` fire every registered hook so dependent plaintext state
/// (the decrypted cache) is dropped.
pub struct MemorySecretProvider {
    secret: RwLock<Option<String>>,
    hooks: Mutex<Vec<InvalidationHook>>,
}

impl MemorySecretProvider {
    /// Create a provider holding the given pass-phrase.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: RwLock::new(Some(secret.into())),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider with no secret; `current` fails until `rotate`.
    pub fn empty() -> Self {
        Self {
            secret: RwLock::new(None),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Replace the pass-phrase and fire invalidation hooks.
    ///
    /// Material derived from the previous secret is stale after this call;
    /// the hooks exist so holders of that material can drop it.
    pub fn rotate(&self, secret: impl Into<String>) {
        *self.secret.write() = Some(secret.into());
        self.fire_hooks();
    }

    /// Drop the pass-phrase and fire invalidation hooks.
    ///
    /// Subsequent `current` calls fail with `CryptoError::MissingSecret`
    /// until the secret is rotated back in.
    pub fn invalidate(&self) {
        *self.secret.write() = None;
        self.fire_hooks();
    }

    fn fire_hooks(&self) {
        // Hooks run outside the secret lock
        let hooks = self.hooks.lock();
        for hook in hooks.iter() {
            hook();
        }
    }
}

impl SecretProvider for MemorySecretProvider {
    fn current(&self) -> Result<String, CryptoError> {
        self.secret
            .read()
            .clone()
            .ok_or(CryptoError::MissingSecret)
    }

    fn on_invalidate(&self, hook: InvalidationHook) {
        self.hooks.lock().push(hook);
    }
}

impl std::fmt::Debug for MemorySecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySecretProvider")
            .field("secret", &"<redacted>")
            .field("hooks", &self.hooks.lock().len())
            .finish()
    }
}
