//! Keyed storage for admission pass records.
//!
//! The store is the only component that mutates a [`CodeRecord`]. It offers
//! a read-by-key lookup plus three conditional writes, each of which behaves
//! as a single compare-and-set on one field:
//!
//! - [`CodeStore::try_create_many`] -- create records for keys that do not exist
//! - [`CodeStore::try_activate`] -- set `activated_at` if it is unset
//! - [`CodeStore::try_mark_used`] -- set `used_at` if it is unset
//!
//! # Storage Backends
//!
//! All backends implement the [`CodeStore`] trait:
//!
//! - [`InMemoryCodeStore`] -- `HashMap`-based store for tests and embedding
//! - [`WalCodeStore`] -- in-memory index backed by a crash-recoverable
//!   write-ahead log
//!
//! # Design Rules
//!
//! 1. Timestamps are write-once. A set field is never overwritten.
//! 2. Creating an existing key is a no-op, never an error.
//! 3. Readers observe either the pre- or post-transition record, never a mix.
//! 4. The store does not know about expiry or ordering between fields.
//! 5. All I/O errors are propagated; a failed write means no transition.
//!
//! [`CodeRecord`]: admit_types::CodeRecord

pub mod error;
mod index;
pub mod memory;
pub mod traits;
pub mod wal;

pub use error::{StoreError, StoreResult};
pub use index::Mutation;
pub use memory::InMemoryCodeStore;
pub use traits::{ActivateOutcome, CodeStore, CreateSummary, MarkUsedOutcome};
pub use wal::{SyncMode, WalCodeStore, WalConfig};
