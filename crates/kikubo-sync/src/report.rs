use kikubo_types::{FieldErrors, InvoiceId};
use serde::{Deserialize, Serialize};

/// An invoice that made it into the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedInvoice {
    pub local_id: Option<String>,
    pub invoice_number: String,
    pub id: InvoiceId,
}

/// An invoice that was rejected, with everything wrong with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedInvoice {
    pub local_id: Option<String>,
    pub invoice_number: String,
    pub errors: FieldErrors,
}

/// Response body of a bulk sync request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: u32,
    pub failed: u32,
    pub synced_invoices: Vec<SyncedInvoice>,
    pub failed_invoices: Vec<FailedInvoice>,
}

impl SyncReport {
    pub fn push_synced(&mut self, entry: SyncedInvoice) {
        self.synced += 1;
        self.synced_invoices.push(entry);
    }

    pub fn push_failed(&mut self, local_id: Option<String>, invoice_number: Option<String>, errors: FieldErrors) {
        self.failed += 1;
        self.failed_invoices.push(FailedInvoice {
            local_id,
            invoice_number: invoice_number
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            errors,
        });
    }

    pub fn total(&self) -> u32 {
        self.synced + self.failed
    }
}
