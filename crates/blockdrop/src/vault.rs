//! The Vault: upload, share and download workflows.
//!
//! The Vault composes the three components. Crypto never sees identities, the
//! cache never sees permissions, and the ledger never sees plaintext or the
//! content store. Ledger decisions always come first: a failed key disclosure
//! aborts a download before any content is fetched.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;

use blockdrop_cache::{CacheConfig, ContentCache, ContentStore};
use blockdrop_core::{
    AuditLogEntry, Clock, ContentAddress, FileId, FileRecord, Identity, IntegrityHash,
    LedgerEvent, SystemClock,
};
use blockdrop_crypto::{
    ContentKey, CryptoError, Envelope, WrappedKey, X25519PublicKey, X25519StaticSecret,
};
use blockdrop_ledger::{AccessLedger, LedgerConfig};
use blockdrop_store::LedgerStore;

use crate::error::{Result, VaultError};

/// Configuration for the Vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Content cache configuration.
    pub cache: CacheConfig,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
    /// Largest plaintext `upload` accepts (default: 10MB).
    pub max_upload_size: usize,
    /// Bound on a single content fetch. None waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    /// How many recent files `warm_cache` preloads.
    pub warm_cache_files: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            ledger: LedgerConfig::default(),
            max_upload_size: 10 * 1024 * 1024, // 10MB
            fetch_timeout: Some(Duration::from_secs(30)),
            warm_cache_files: 10,
        }
    }
}

/// What `upload` hands back to the owner.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub file_id: FileId,
    pub address: ContentAddress,
    pub integrity_hash: IntegrityHash,
    /// The content key, needed later to share the file.
    pub key: ContentKey,
}

/// Encrypted file vault.
pub struct Vault<S: LedgerStore, C: ContentStore> {
    ledger: AccessLedger<S>,
    cache: ContentCache<C>,
    config: VaultConfig,
}

impl<S: LedgerStore, C: ContentStore> Vault<S, C> {
    /// Open a vault: restore ledger state from `store` and warm the cache from
    /// its snapshot, if one is configured.
    pub async fn open(store: S, content: C, config: VaultConfig) -> Result<Self> {
        Self::with_clock(store, content, config, Arc::new(SystemClock)).await
    }

    /// Open with an explicit time source.
    pub async fn with_clock(
        store: S,
        content: C,
        config: VaultConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let ledger = AccessLedger::with_clock(store, config.ledger.clone(), clock.clone()).await?;
        let cache = ContentCache::open(content, config.cache.clone(), clock).await;
        Ok(Self {
            ledger,
            cache,
            config,
        })
    }

    pub fn ledger(&self) -> &AccessLedger<S> {
        &self.ledger
    }

    pub fn cache(&self) -> &ContentCache<C> {
        &self.cache
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Subscribe to ledger events.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.ledger.subscribe()
    }

    /// Persist the cache snapshot. Returns whether one was written.
    pub async fn shutdown(&self) -> bool {
        self.cache.persist().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Workflows
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt `plaintext` under a fresh key, store the ciphertext and register
    /// the file with the owner's wrapped key.
    pub async fn upload(
        &self,
        owner: &X25519StaticSecret,
        name: &str,
        plaintext: &[u8],
    ) -> Result<UploadReceipt> {
        if plaintext.len() > self.config.max_upload_size {
            return Err(VaultError::PayloadTooLarge {
                size: plaintext.len(),
                max: self.config.max_upload_size,
            });
        }

        let key = ContentKey::generate()?;
        let sealed = Envelope::seal(plaintext, &key)?;
        let address = self
            .cache
            .put(Bytes::from(sealed.to_base64().into_bytes()))
            .await?;

        let integrity_hash = IntegrityHash::compute(name, &address);
        let owner_envelope = WrappedKey::wrap(&key, &owner.public_key())?.to_key_envelope();
        let file_id = self
            .ledger
            .store_file(address.clone(), integrity_hash, owner_envelope, owner.identity())
            .await?;

        tracing::info!(
            file = %file_id,
            address = %address,
            size = plaintext.len(),
            "upload complete"
        );
        Ok(UploadReceipt {
            file_id,
            address,
            integrity_hash,
            key,
        })
    }

    /// Wrap `key` for `recipient` and grant them access until `expires_at`
    /// (Unix ms, 0 = never).
    pub async fn share(
        &self,
        file_id: FileId,
        owner: &X25519StaticSecret,
        key: &ContentKey,
        recipient: &X25519PublicKey,
        expires_at: i64,
    ) -> Result<()> {
        let wrapped = WrappedKey::wrap(key, recipient)?;
        self.ledger
            .grant_access(
                file_id,
                recipient.identity(),
                wrapped.to_key_envelope(),
                expires_at,
                owner.identity(),
            )
            .await?;
        Ok(())
    }

    /// Obtain the caller's key envelope from the ledger and unwrap it.
    ///
    /// Counts as an access in the audit trail.
    pub async fn recover_key(
        &self,
        file_id: FileId,
        caller: &X25519StaticSecret,
    ) -> Result<ContentKey> {
        let envelope = self
            .ledger
            .get_decryption_key(file_id, caller.identity())
            .await?;
        let key = WrappedKey::from_key_envelope(&envelope)?.unwrap(caller)?;
        Ok(key)
    }

    /// Authorize, fetch and decrypt a file.
    pub async fn download(&self, file_id: FileId, caller: &X25519StaticSecret) -> Result<Vec<u8>> {
        let key = self.recover_key(file_id, caller).await?;
        let record = self.ledger.get_file(file_id).await?;

        let bytes = self.fetch(&record.content_address).await?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| CryptoError::DecodeFailed(format!("envelope is not base64 text: {}", e)))?;
        let plaintext = Envelope::from_base64(text)?.open(&key)?;

        tracing::debug!(file = %file_id, caller = %caller.identity(), "download complete");
        Ok(plaintext)
    }

    /// Revoke `recipient`'s access.
    pub async fn revoke(
        &self,
        file_id: FileId,
        owner: &X25519StaticSecret,
        recipient: Identity,
    ) -> Result<()> {
        self.ledger
            .revoke_access(file_id, recipient, owner.identity())
            .await?;
        Ok(())
    }

    /// Deactivate a file for everyone.
    pub async fn deactivate(&self, file_id: FileId, owner: &X25519StaticSecret) -> Result<()> {
        self.ledger.deactivate_file(file_id, owner.identity()).await?;
        Ok(())
    }

    pub async fn recipients(
        &self,
        file_id: FileId,
        owner: &X25519StaticSecret,
    ) -> Result<Vec<Identity>> {
        Ok(self
            .ledger
            .get_file_recipients(file_id, owner.identity())
            .await?)
    }

    pub async fn audit_logs(
        &self,
        file_id: FileId,
        owner: &X25519StaticSecret,
    ) -> Result<Vec<AuditLogEntry>> {
        Ok(self.ledger.get_audit_logs(file_id, owner.identity()).await?)
    }

    pub async fn has_access(&self, file_id: FileId, user: Identity) -> Result<bool> {
        Ok(self.ledger.has_access(file_id, user).await?)
    }

    pub async fn file(&self, file_id: FileId) -> Result<FileRecord> {
        Ok(self.ledger.get_file(file_id).await?)
    }

    /// Preload the ciphertext of `owner`'s most recent active files.
    ///
    /// Returns how many blobs were fetched.
    pub async fn warm_cache(&self, owner: Identity) -> Result<usize> {
        let mut addresses = Vec::new();
        for file_id in self.ledger.get_user_files(owner).await.into_iter().rev() {
            if addresses.len() >= self.config.warm_cache_files {
                break;
            }
            let record = self.ledger.get_file(file_id).await?;
            if record.active {
                addresses.push(record.content_address);
            }
        }
        Ok(self.cache.preload(&addresses).await)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn fetch(&self, address: &ContentAddress) -> Result<Bytes> {
        match self.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.cache.get(address))
                .await
                .map_err(|_| VaultError::Timeout(limit))?
                .map_err(VaultError::from),
            None => Ok(self.cache.get(address).await?),
        }
    }
}
