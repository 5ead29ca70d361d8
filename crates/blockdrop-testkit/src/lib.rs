//! # BlockDrop Testkit
//!
//! Testing utilities for BlockDrop.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Known-answer vectors**: fixed AES-256-GCM envelopes that any conforming
//!   implementation must reproduce byte for byte
//! - **Generators**: Proptest strategies for identities, records and mutations
//! - **Fixtures**: A vault over in-memory stores and a manual clock
//!
//! ## Known-Answer Vectors
//!
//! ```rust
//! use blockdrop_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! for vector in all_vectors() {
//!     println!("{}: {}", vector.name, vector.envelope_base64);
//! }
//! assert!(verify_all_vectors().is_ok());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use blockdrop_testkit::generators::identity;
//!
//! proptest! {
//!     #[test]
//!     fn hex_roundtrip(id in identity()) {
//!         prop_assert_eq!(blockdrop_core::Identity::from_hex(&id.to_hex()).unwrap(), id);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use blockdrop_testkit::fixtures::{Party, VaultFixture};
//!
//! async fn example() {
//!     let fixture = VaultFixture::new().await;
//!     let alice = Party::new();
//!     let receipt = fixture.vault.upload(&alice.secret, "a.txt", b"data").await.unwrap();
//!     # let _ = receipt;
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{Party, VaultFixture};
pub use vectors::{all_vectors, verify_all_vectors, EnvelopeVector};
