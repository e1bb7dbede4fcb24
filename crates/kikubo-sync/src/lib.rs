//! Bulk reconciliation of invoices recorded while a POS client was offline.
//!
//! A batch goes through [`BulkSyncEngine::reconcile`]. Each record is
//! decoded on its own, run through an ordered pipeline of [`SyncCheck`]s
//! and committed atomically with its stock movements. The result is a
//! [`SyncReport`] listing what was synced and why the rest was rejected,
//! and a `SyncLog` row for the audit trail.

pub mod check;
pub mod checks;
pub mod engine;
pub mod error;
pub mod offline;
pub mod report;

pub use check::{CheckContext, CheckDecision, Draft, Line, SyncCheck};
pub use engine::{BulkSyncEngine, SyncConfig, SyncState, HISTORY_LIMIT, NON_FIELD_ERRORS_KEY};
pub use error::{SyncError, SyncResult};
pub use offline::{OfflineInvoice, OfflineItem};
pub use report::{FailedInvoice, SyncReport, SyncedInvoice};
