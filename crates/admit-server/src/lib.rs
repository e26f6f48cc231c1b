//! HTTP server for Admit.
//!
//! Exposes the lifecycle engine's four operations as JSON `POST` endpoints
//! for the guest, scanner and import surfaces. Clients poll `verify`; there
//! is no push channel.

pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::AdmitServer;
pub use state::AppState;
