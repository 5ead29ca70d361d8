//! End-to-end workflows through the Vault.
//!
//! Each test drives upload, share, download, revoke and deactivate the way a
//! client would, then checks both what the caller saw and what the ledger
//! recorded.

use std::sync::Arc;
use std::time::Duration;

use blockdrop::cache::{CacheConfig, ContentStore, MemoryContentStore};
use blockdrop::core::{LedgerEvent, ManualClock};
use blockdrop::crypto::CryptoError;
use blockdrop::ledger::LedgerError;
use blockdrop::store::{MemoryStore, SqliteStore};
use blockdrop::{AuditAction, Vault, VaultConfig, VaultError, X25519StaticSecret};
use rand::RngCore;

const START: i64 = 1_700_000_000_000;
const HOUR_MS: i64 = 60 * 60 * 1_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Harness {
    vault: Vault<Arc<MemoryStore>, Arc<MemoryContentStore>>,
    content: Arc<MemoryContentStore>,
    clock: Arc<ManualClock>,
}

async fn harness(config: VaultConfig) -> Harness {
    init_tracing();
    let content = Arc::new(MemoryContentStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let vault = Vault::with_clock(
        Arc::new(MemoryStore::new()),
        content.clone(),
        config,
        clock.clone(),
    )
    .await
    .unwrap();
    Harness {
        vault,
        content,
        clock,
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[tokio::test]
async fn share_with_bob_and_read_back() {
    let h = harness(VaultConfig::default()).await;
    let alice = X25519StaticSecret::generate();
    let bob = X25519StaticSecret::generate();
    let payload = random_bytes(1000);

    let receipt = h.vault.upload(&alice, "photo.jpg", &payload).await.unwrap();
    h.vault
        .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), 0)
        .await
        .unwrap();

    assert!(h.vault.has_access(receipt.file_id, bob.identity()).await.unwrap());
    assert_eq!(h.vault.download(receipt.file_id, &bob).await.unwrap(), payload);
    assert_eq!(h.vault.download(receipt.file_id, &alice).await.unwrap(), payload);

    let logs = h.vault.audit_logs(receipt.file_id, &alice).await.unwrap();
    let actions: Vec<_> = logs.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Upload,
            AuditAction::Share,
            AuditAction::Access,
            AuditAction::Access,
        ]
    );
    assert_eq!(logs[2].details, "Recipient accessed file");
    assert_eq!(logs[3].details, "Owner accessed file");
    assert!(logs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    // The blob was put through the cache, so downloads never went to the store.
    assert_eq!(h.content.get_calls(), 0);
    assert_eq!(h.vault.file(receipt.file_id).await.unwrap().access_count, 2);
}

#[tokio::test]
async fn revoke_then_regrant() {
    let h = harness(VaultConfig::default()).await;
    let alice = X25519StaticSecret::generate();
    let bob = X25519StaticSecret::generate();
    let receipt = h.vault.upload(&alice, "doc", b"v1").await.unwrap();

    h.vault
        .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), 0)
        .await
        .unwrap();
    h.vault
        .revoke(receipt.file_id, &alice, bob.identity())
        .await
        .unwrap();

    assert!(!h.vault.has_access(receipt.file_id, bob.identity()).await.unwrap());
    assert!(matches!(
        h.vault.download(receipt.file_id, &bob).await,
        Err(VaultError::Ledger(LedgerError::AccessDenied { .. }))
    ));

    // Revoking twice is an error; the permission is already inactive.
    assert!(matches!(
        h.vault.revoke(receipt.file_id, &alice, bob.identity()).await,
        Err(VaultError::Ledger(LedgerError::NotGranted { .. }))
    ));

    h.vault
        .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), 0)
        .await
        .unwrap();
    assert_eq!(h.vault.download(receipt.file_id, &bob).await.unwrap(), b"v1");

    // Re-granting does not duplicate the recipient.
    assert_eq!(
        h.vault.recipients(receipt.file_id, &alice).await.unwrap(),
        vec![bob.identity()]
    );
}

#[tokio::test]
async fn expired_grant_is_rejected() {
    let h = harness(VaultConfig::default()).await;
    let alice = X25519StaticSecret::generate();
    let bob = X25519StaticSecret::generate();
    let receipt = h.vault.upload(&alice, "doc", b"short lived").await.unwrap();

    let expires_at = START + HOUR_MS;
    h.vault
        .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), expires_at)
        .await
        .unwrap();
    assert!(h.vault.download(receipt.file_id, &bob).await.is_ok());

    // Expiry is strict: still valid at exactly expires_at.
    h.clock.set(expires_at);
    assert!(h.vault.has_access(receipt.file_id, bob.identity()).await.unwrap());

    h.clock.set(expires_at + 1);
    assert!(!h.vault.has_access(receipt.file_id, bob.identity()).await.unwrap());
    match h.vault.download(receipt.file_id, &bob).await {
        Err(VaultError::Ledger(LedgerError::AccessExpired { expired_at, .. })) => {
            assert_eq!(expired_at, expires_at)
        }
        other => panic!("expected AccessExpired, got {:?}", other.map(|_| ())),
    }

    // The owner never expires.
    assert!(h.vault.download(receipt.file_id, &alice).await.is_ok());
}

#[tokio::test]
async fn deactivation_locks_out_everyone() {
    let h = harness(VaultConfig::default()).await;
    let alice = X25519StaticSecret::generate();
    let bob = X25519StaticSecret::generate();
    let receipt = h.vault.upload(&alice, "doc", b"gone soon").await.unwrap();
    h.vault
        .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), 0)
        .await
        .unwrap();

    h.vault.deactivate(receipt.file_id, &alice).await.unwrap();

    for caller in [&alice, &bob] {
        assert!(!h.vault.has_access(receipt.file_id, caller.identity()).await.unwrap());
        assert!(matches!(
            h.vault.download(receipt.file_id, caller).await,
            Err(VaultError::Ledger(LedgerError::FileInactive(_)))
        ));
    }

    // Bob's permission itself is untouched, and the audit log is still readable.
    assert_eq!(
        h.vault.recipients(receipt.file_id, &alice).await.unwrap(),
        vec![bob.identity()]
    );
    let last = h
        .vault
        .audit_logs(receipt.file_id, &alice)
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(last.action, AuditAction::Deactivate);
    assert_eq!(h.vault.file(receipt.file_id).await.unwrap().access_count, 0);
}

#[tokio::test]
async fn denied_download_aborts_before_fetch() {
    let h = harness(VaultConfig::default()).await;
    let alice = X25519StaticSecret::generate();
    let mallory = X25519StaticSecret::generate();
    let receipt = h.vault.upload(&alice, "doc", b"private").await.unwrap();
    h.vault.cache().clear();

    assert!(h.vault.download(receipt.file_id, &mallory).await.is_err());
    assert_eq!(h.content.get_calls(), 0);

    // Only Alice's upload is on record.
    let logs = h.vault.audit_logs(receipt.file_id, &alice).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(matches!(
        h.vault.audit_logs(receipt.file_id, &mallory).await,
        Err(VaultError::Ledger(LedgerError::NotOwner { .. }))
    ));
}

#[tokio::test]
async fn slow_store_times_out() {
    let h = harness(VaultConfig {
        fetch_timeout: Some(Duration::from_millis(20)),
        ..VaultConfig::default()
    })
    .await;
    let alice = X25519StaticSecret::generate();
    let receipt = h.vault.upload(&alice, "doc", b"slow").await.unwrap();
    h.vault.cache().clear();
    h.content.set_latency(Some(Duration::from_secs(5)));

    assert!(matches!(
        h.vault.download(receipt.file_id, &alice).await,
        Err(VaultError::Timeout(_))
    ));

    h.content.set_latency(None);
    assert_eq!(h.vault.download(receipt.file_id, &alice).await.unwrap(), b"slow");
}

#[tokio::test]
async fn tampered_blob_fails_authentication() {
    let h = harness(VaultConfig::default()).await;
    let alice = X25519StaticSecret::generate();
    let receipt = h.vault.upload(&alice, "doc", b"original").await.unwrap();

    // Swap the cached ciphertext for another envelope under a different key.
    let other = h.vault.upload(&alice, "other", b"original").await.unwrap();
    let forged = h.content.get(&other.address).await.unwrap();
    h.vault.cache().set(receipt.address.clone(), forged);

    assert!(matches!(
        h.vault.download(receipt.file_id, &alice).await,
        Err(VaultError::Crypto(CryptoError::AuthenticationFailed))
    ));
}

#[tokio::test]
async fn events_follow_the_workflow() {
    let h = harness(VaultConfig::default()).await;
    let mut events = h.vault.subscribe();
    let alice = X25519StaticSecret::generate();
    let bob = X25519StaticSecret::generate();

    let receipt = h.vault.upload(&alice, "doc", b"x").await.unwrap();
    h.vault
        .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), 0)
        .await
        .unwrap();
    h.vault.download(receipt.file_id, &bob).await.unwrap();
    h.vault
        .revoke(receipt.file_id, &alice, bob.identity())
        .await
        .unwrap();

    let id = receipt.file_id;
    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::FileStored {
            file_id: id,
            owner: alice.identity()
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::AccessGranted {
            file_id: id,
            recipient: bob.identity(),
            expires_at: 0
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::FileAccessed {
            file_id: id,
            accessor: bob.identity()
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        LedgerEvent::AccessRevoked {
            file_id: id,
            recipient: bob.identity()
        }
    );
}

#[tokio::test]
async fn reopen_restores_ledger_and_cache() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ledger.db");
    let config = VaultConfig {
        cache: CacheConfig {
            snapshot_path: Some(dir.path().join("cache.snapshot")),
            ..CacheConfig::default()
        },
        ..VaultConfig::default()
    };
    let content = Arc::new(MemoryContentStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let alice = X25519StaticSecret::generate();
    let bob = X25519StaticSecret::generate();

    let receipt = {
        let vault = Vault::with_clock(
            SqliteStore::open(&db).unwrap(),
            content.clone(),
            config.clone(),
            clock.clone(),
        )
        .await
        .unwrap();
        let receipt = vault.upload(&alice, "doc", b"durable").await.unwrap();
        vault
            .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), 0)
            .await
            .unwrap();
        assert!(vault.shutdown().await);
        receipt
    };

    clock.advance(HOUR_MS);
    let vault = Vault::with_clock(
        SqliteStore::open(&db).unwrap(),
        content.clone(),
        config.clone(),
        clock.clone(),
    )
    .await
    .unwrap();

    assert!(vault.cache().contains(&receipt.address));
    assert_eq!(vault.download(receipt.file_id, &bob).await.unwrap(), b"durable");
    assert_eq!(content.get_calls(), 0);
    assert_eq!(vault.audit_logs(receipt.file_id, &alice).await.unwrap().len(), 3);
    assert!(vault.shutdown().await);
    drop(vault);

    // A snapshot older than a day is ignored; the ledger still is not.
    clock.advance(25 * HOUR_MS);
    let vault = Vault::with_clock(
        SqliteStore::open(&db).unwrap(),
        content.clone(),
        config,
        clock.clone(),
    )
    .await
    .unwrap();
    assert!(!vault.cache().contains(&receipt.address));
    assert_eq!(vault.download(receipt.file_id, &alice).await.unwrap(), b"durable");
    assert_eq!(content.get_calls(), 1);
}

#[tokio::test]
async fn warm_cache_preloads_recent_files() {
    let h = harness(VaultConfig {
        warm_cache_files: 3,
        ..VaultConfig::default()
    })
    .await;
    let alice = X25519StaticSecret::generate();

    let mut receipts = Vec::new();
    for i in 0..5 {
        let name = format!("file-{}", i);
        receipts.push(h.vault.upload(&alice, &name, name.as_bytes()).await.unwrap());
    }
    h.vault.cache().clear();

    assert_eq!(h.vault.warm_cache(alice.identity()).await.unwrap(), 3);
    for receipt in &receipts[2..] {
        assert!(h.vault.cache().contains(&receipt.address));
    }
    for receipt in &receipts[..2] {
        assert!(!h.vault.cache().contains(&receipt.address));
    }
}
