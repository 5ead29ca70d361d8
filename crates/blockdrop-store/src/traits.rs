//! LedgerStore trait: the persistence boundary for the access ledger.
//!
//! The ledger keeps its working state in memory and writes every committed
//! [`LedgerMutation`] through this trait. On restart, [`LedgerStore::load`]
//! rebuilds the same state.

use async_trait::async_trait;

use blockdrop_core::{LedgerMutation, LedgerState};

use crate::error::Result;

/// Async interface for ledger persistence.
///
/// # Design Notes
///
/// - **Atomic commits**: a mutation's state change and its audit entry are
///   written together or not at all.
/// - **Ordered**: `load` reproduces the exact commit order of audit entries and
///   recipients.
/// - **Owned**: the ledger runs commits on spawned tasks, so stores are
///   `'static`.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Durably record one mutation.
    async fn commit(&self, mutation: &LedgerMutation) -> Result<()>;

    /// Rebuild ledger state from everything committed so far.
    async fn load(&self) -> Result<LedgerState>;
}

#[async_trait]
impl<S: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<S> {
    async fn commit(&self, mutation: &LedgerMutation) -> Result<()> {
        (**self).commit(mutation).await
    }

    async fn load(&self) -> Result<LedgerState> {
        (**self).load().await
    }
}
