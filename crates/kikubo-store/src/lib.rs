//! Persistence layer for the Kikubo POS backend.
//!
//! [`PosStore`] is the single storage seam. Two backends ship with the
//! crate:
//!
//! - [`InMemoryPosStore`] for tests and throwaway servers
//! - [`SqliteStore`] for durable single-node deployments
//!
//! Both enforce the same uniqueness rules and commit invoices atomically
//! together with their stock decrements.

pub mod error;
pub mod memory;
pub mod sqlite;
mod stock;
pub mod traits;

#[cfg(test)]
mod conformance;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryPosStore;
pub use sqlite::SqliteStore;
pub use traits::PosStore;
