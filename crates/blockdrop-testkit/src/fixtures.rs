//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use blockdrop::{Vault, VaultConfig};
use blockdrop_cache::MemoryContentStore;
use blockdrop_core::{Identity, ManualClock};
use blockdrop_crypto::{X25519PublicKey, X25519StaticSecret};
use blockdrop_store::MemoryStore;

/// Fixed start time for fixtures: 2023-11-14T22:13:20Z.
pub const FIXTURE_START_MILLIS: i64 = 1_700_000_000_000;

/// A participant with an X25519 key pair.
pub struct Party {
    pub secret: X25519StaticSecret,
    pub public: X25519PublicKey,
    pub identity: Identity,
}

impl Party {
    /// Create a party with a random key.
    pub fn new() -> Self {
        Self::from_secret(X25519StaticSecret::generate())
    }

    /// Create with a deterministic key from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_secret(X25519StaticSecret::from_bytes(seed))
    }

    fn from_secret(secret: X25519StaticSecret) -> Self {
        let public = secret.public_key();
        let identity = secret.identity();
        Self {
            secret,
            public,
            identity,
        }
    }
}

impl Default for Party {
    fn default() -> Self {
        Self::new()
    }
}

/// Create `n` parties with distinct deterministic keys.
pub fn parties(n: usize) -> Vec<Party> {
    (0..n)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
            Party::with_seed(seed)
        })
        .collect()
}

/// A vault over in-memory stores with a manual clock.
pub struct VaultFixture {
    pub vault: Vault<Arc<MemoryStore>, Arc<MemoryContentStore>>,
    pub store: Arc<MemoryStore>,
    pub content: Arc<MemoryContentStore>,
    pub clock: Arc<ManualClock>,
}

impl VaultFixture {
    /// Create a fixture with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(VaultConfig::default()).await
    }

    /// Create a fixture with a custom configuration.
    ///
    /// Panics if the vault cannot be opened, which an empty memory store
    /// never causes.
    pub async fn with_config(config: VaultConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let content = Arc::new(MemoryContentStore::new());
        let clock = Arc::new(ManualClock::new(FIXTURE_START_MILLIS));
        let vault = Vault::with_clock(store.clone(), content.clone(), config, clock.clone())
            .await
            .expect("open vault over empty memory stores");
        Self {
            vault,
            store,
            content,
            clock,
        }
    }

    /// Advance the clock by `millis`.
    pub fn advance(&self, millis: i64) {
        self.clock.advance(millis);
    }
}
