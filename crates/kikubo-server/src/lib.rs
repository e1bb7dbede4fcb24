//! HTTP server for the Kikubo POS backend.
//!
//! Serves the REST API used by POS clients: accounts and bearer sessions,
//! store and catalog management, online invoices, bulk reconciliation of
//! invoices recorded offline, and sales reports. Every store-scoped
//! endpoint works on the caller's own store only.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pagination;
pub mod payload;
pub mod router;
pub mod server;
pub mod state;

pub use auth::Auth;
pub use config::{DatabaseConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use pagination::{paginate, Page};
pub use router::build_router;
pub use server::KikuboServer;
pub use state::{AppState, SharedState};

#[cfg(test)]
mod tests;
