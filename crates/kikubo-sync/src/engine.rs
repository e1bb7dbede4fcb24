use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kikubo_auth::Principal;
use kikubo_store::{PosStore, StoreError};
use kikubo_types::{
    FieldErrors, Store, SyncKind, SyncLog, SyncLogId, SyncLogStatus, SyncStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::check::{CheckContext, CheckDecision, Draft, SyncCheck};
use crate::checks::{
    AmountsCheck, DetailsCheck, InvoiceNumberCheck, ItemsCheck, SalespersonCheck, StockCheck,
};
use crate::error::{SyncError, SyncResult};
use crate::offline::{raw_identity, OfflineInvoice};
use crate::report::{SyncReport, SyncedInvoice};

/// Field key for problems that are not tied to one input field.
pub const NON_FIELD_ERRORS_KEY: &str = "error";

/// Logs returned by [`BulkSyncEngine::history`].
pub const HISTORY_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Largest accepted batch.
    pub max_batch: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { max_batch: 500 }
    }
}

/// Sync state of one user, as shown on the client's status bar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub pending_invoices: usize,
    pub last_sync_time: Option<DateTime<Utc>>,
    /// `online` when nothing is pending, else `pending`.
    pub sync_status: String,
}

// ---------------------------------------------------------------------------
// BulkSyncEngine
// ---------------------------------------------------------------------------

/// Reconciles batches of offline invoices against the store.
///
/// Every record runs through the check pipeline on its own and is
/// committed atomically; one bad record never blocks the rest of the batch.
pub struct BulkSyncEngine {
    db: Arc<dyn PosStore>,
    checks: Vec<Box<dyn SyncCheck>>,
    config: SyncConfig,
}

impl BulkSyncEngine {
    /// An engine with no checks. Use [`Self::add_check`] or
    /// [`Self::with_default_checks`].
    pub fn new(db: Arc<dyn PosStore>, config: SyncConfig) -> Self {
        Self {
            db,
            checks: Vec::new(),
            config,
        }
    }

    /// Number -> salesperson -> items -> amounts -> details -> stock.
    pub fn with_default_checks(db: Arc<dyn PosStore>, config: SyncConfig) -> Self {
        let mut engine = Self::new(db, config);
        engine.add_check(Box::new(InvoiceNumberCheck));
        engine.add_check(Box::new(SalespersonCheck));
        engine.add_check(Box::new(ItemsCheck));
        engine.add_check(Box::new(AmountsCheck));
        engine.add_check(Box::new(DetailsCheck));
        engine.add_check(Box::new(StockCheck));
        engine
    }

    pub fn add_check(&mut self, check: Box<dyn SyncCheck>) {
        self.checks.push(check);
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile one `{"invoices": [...]}` request body.
    ///
    /// Only a malformed or oversized body fails the call as a whole.
    pub fn reconcile(&self, principal: &Principal, body: &Value) -> SyncResult<SyncReport> {
        let store = principal.store.as_ref().ok_or(SyncError::NoStore)?;
        let invoices = body
            .get("invoices")
            .and_then(Value::as_array)
            .ok_or(SyncError::MalformedBatch)?;
        if invoices.len() > self.config.max_batch {
            return Err(SyncError::BatchTooLarge {
                size: invoices.len(),
                max: self.config.max_batch,
            });
        }

        let started_at = Utc::now();
        let mut report = SyncReport::default();
        let mut seen = HashSet::new();

        for raw in invoices {
            let (local_id, raw_number) = raw_identity(raw);
            let offline = match OfflineInvoice::decode(raw) {
                Ok(offline) => offline,
                Err(e) => {
                    tracing::warn!(local_id = ?local_id, error = %e, "undecodable offline invoice");
                    report.push_failed(
                        local_id,
                        raw_number,
                        FieldErrors::single(NON_FIELD_ERRORS_KEY, e.to_string()),
                    );
                    continue;
                }
            };

            let mut draft = Draft::new(offline);
            match self.apply(&mut draft, store, principal, &seen) {
                Ok(entry) => {
                    seen.insert(entry.invoice_number.clone());
                    report.push_synced(entry);
                }
                Err(errors) => {
                    tracing::warn!(
                        local_id = ?draft.raw.local_id,
                        invoice_number = %draft.invoice_number,
                        %errors,
                        "offline invoice rejected"
                    );
                    report.push_failed(
                        draft.raw.local_id.clone(),
                        Some(draft.invoice_number.clone()),
                        errors,
                    );
                }
            }
        }

        if let Err(e) = self.write_log(principal, store, &report, started_at) {
            tracing::error!(user = %principal.id(), error = %e, "failed to record sync log");
        }
        tracing::info!(
            user = %principal.id(),
            store = %store.code,
            synced = report.synced,
            failed = report.failed,
            "bulk sync finished"
        );
        Ok(report)
    }

    /// Run the checks and commit. Every failure is reported as field errors.
    fn apply(
        &self,
        draft: &mut Draft,
        store: &Store,
        principal: &Principal,
        seen: &HashSet<String>,
    ) -> Result<SyncedInvoice, FieldErrors> {
        let ctx = CheckContext {
            db: self.db.as_ref(),
            store,
            principal,
            seen_numbers: seen,
        };

        let mut errors = FieldErrors::new();
        for check in &self.checks {
            if check.needs_clean_record() && !errors.is_empty() {
                continue;
            }
            match check.evaluate(draft, &ctx) {
                Ok(CheckDecision::Pass) => {}
                Ok(CheckDecision::Fail(failed)) => {
                    tracing::debug!(check = check.name(), %failed, "check failed");
                    errors.extend(failed);
                }
                Err(e) => {
                    tracing::error!(check = check.name(), error = %e, "check aborted");
                    return Err(FieldErrors::single(NON_FIELD_ERRORS_KEY, e.to_string()));
                }
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let Some(new_invoice) = draft.to_new_invoice(store, Utc::now()) else {
            return Err(FieldErrors::single("salesperson", "This field is required."));
        };
        match self.db.commit_invoice(new_invoice) {
            Ok(invoice) => {
                tracing::info!(
                    invoice = %invoice.id,
                    invoice_number = %invoice.invoice_number,
                    total = %invoice.total,
                    "offline invoice synced"
                );
                Ok(SyncedInvoice {
                    local_id: invoice.local_id.clone(),
                    invoice_number: invoice.invoice_number,
                    id: invoice.id,
                })
            }
            Err(e) => Err(commit_errors(e)),
        }
    }

    fn write_log(
        &self,
        principal: &Principal,
        store: &Store,
        report: &SyncReport,
        started_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let status = SyncLogStatus::from_counts(report.synced, report.failed);
        let error_message = (report.failed > 0)
            .then(|| format!("{} of {} invoices failed to sync", report.failed, report.total()));
        let log = SyncLog {
            id: SyncLogId::new(),
            user: principal.id(),
            store: store.id,
            sync_type: SyncKind::Invoice,
            status,
            items_synced: report.synced,
            items_failed: report.failed,
            error_message,
            details: serde_json::json!({
                "synced_invoices": report.synced_invoices,
                "failed_invoices": report.failed_invoices,
            }),
            started_at,
            completed_at: Some(Utc::now()),
        };
        self.db.record_sync_log(&log)?;
        Ok(())
    }

    /// Pending invoices and last completed sync of the caller.
    pub fn status(&self, principal: &Principal) -> SyncResult<SyncState> {
        let store = principal.store.as_ref().ok_or(SyncError::NoStore)?;
        let pending_invoices = self
            .db
            .list_invoices(store.id)?
            .iter()
            .filter(|i| i.salesperson == principal.id() && i.sync_status == SyncStatus::Pending)
            .count();
        let last_sync_time = self
            .db
            .list_sync_logs(principal.id(), usize::MAX)?
            .into_iter()
            .find(|log| log.status == SyncLogStatus::Completed)
            .and_then(|log| log.completed_at);
        Ok(SyncState {
            pending_invoices,
            last_sync_time,
            sync_status: if pending_invoices == 0 { "online" } else { "pending" }.to_string(),
        })
    }

    /// The caller's most recent sync logs, newest first.
    pub fn history(&self, principal: &Principal) -> SyncResult<Vec<SyncLog>> {
        Ok(self.db.list_sync_logs(principal.id(), HISTORY_LIMIT)?)
    }
}

/// Map a rejected commit onto the field that caused it.
fn commit_errors(error: StoreError) -> FieldErrors {
    match error {
        StoreError::DuplicateInvoice { invoice_number, .. } => FieldErrors::single(
            "invoice_number",
            format!("Invoice with number \"{invoice_number}\" already exists."),
        ),
        StoreError::InsufficientStock {
            code,
            available,
            requested,
            ..
        } => FieldErrors::single(
            "items",
            format!("Insufficient stock for {code}. Available: {available}, Requested: {requested}"),
        ),
        StoreError::ProductUnavailable { product } => FieldErrors::single(
            "items",
            format!("product \"{product}\" is not available in this store."),
        ),
        StoreError::QuantityOutOfRange { .. } => {
            FieldErrors::single("items", "Requested quantity is out of range.")
        }
        other => {
            if other.is_rejection() {
                tracing::warn!(error = %other, "invoice commit rejected");
            } else {
                tracing::error!(error = %other, "invoice commit failed");
            }
            FieldErrors::single(NON_FIELD_ERRORS_KEY, other.to_string())
        }
    }
}
