//! Foundation types for Admit.
//!
//! This crate provides the identity and record types shared by every other
//! Admit crate.
//!
//! # Key Types
//!
//! - [`Code`] — Normalized, case-sensitive admission code (the primary key)
//! - [`CodeRecord`] — One pass: its code plus the activation and use timestamps
//! - [`generate_code`] — Random alphanumeric code generation for provisioning

pub mod code;
pub mod error;
pub mod record;

pub use code::{generate_code, Code};
pub use error::TypeError;
pub use record::CodeRecord;
