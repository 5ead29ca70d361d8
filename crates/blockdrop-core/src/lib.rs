//! # BlockDrop Core
//!
//! Pure primitives for BlockDrop: identities, file records, permissions and
//! the audit trail.
//!
//! This crate contains no I/O, no storage, no networking. The access rules live
//! in `blockdrop-ledger`; this crate only describes the data and how committed
//! mutations fold into state.
//!
//! ## Key Types
//!
//! - [`FileRecord`] - One stored file, keyed by a 1-based [`FileId`]
//! - [`AccessPermission`] - A recipient's revocable, expiring grant
//! - [`AuditLogEntry`] - Append-only audit trail entry
//! - [`LedgerMutation`] - A change plus its audit entry, committed as a unit
//! - [`LedgerState`] - Tables and indices rebuilt by replaying mutations
//! - [`Clock`] - Injected time source

pub mod clock;
pub mod error;
pub mod mutation;
pub mod record;
pub mod state;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
pub use mutation::{Change, LedgerEvent, LedgerMutation};
pub use record::{AccessPermission, AuditAction, AuditLogEntry, FileRecord, KeyEnvelope};
pub use state::LedgerState;
pub use types::{ContentAddress, FileId, Identity, IntegrityHash};
