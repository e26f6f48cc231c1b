//! Lifecycle engine for Admit admission passes.
//!
//! The engine is the only component that knows the validity window and the
//! status taxonomy. It never touches a record directly: every transition is
//! one conditional call on an injected [`CodeStore`](admit_store::CodeStore).
//!
//! # Operations
//!
//! - [`LifecycleEngine::derive_status`] — pure status from a record and `now`
//! - [`LifecycleEngine::activate`] — claim a pass (idempotent)
//! - [`LifecycleEngine::verify`] — read-only status check, safe to poll
//! - [`LifecycleEngine::confirm_use`] — admit the bearer, exactly once
//! - [`LifecycleEngine::bulk_import`] — provision codes with dedup
//!
//! `now` is always an argument, so every operation is deterministic.

pub mod config;
pub mod engine;
pub mod error;
pub mod header;
pub mod outcome;
pub mod status;

pub use config::EngineConfig;
pub use engine::LifecycleEngine;
pub use error::{EngineError, EngineResult};
pub use header::HeaderRule;
pub use outcome::{ActivationResult, ConfirmResult, ImportSummary, RejectReason};
pub use status::{derive_status, PassStatus};
