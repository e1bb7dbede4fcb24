use std::collections::HashSet;

use chrono::{DateTime, Utc};
use kikubo_auth::Principal;
use kikubo_store::PosStore;
use kikubo_types::{
    FieldErrors, InvoiceTotals, Money, NewInvoice, NewInvoiceItem, Product, Store, SyncStatus,
    User,
};

use crate::error::SyncResult;
use crate::offline::OfflineInvoice;

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// A resolved invoice line.
#[derive(Clone, Debug)]
pub struct Line {
    pub product: Product,
    pub product_name: String,
    pub product_code: String,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
}

/// One offline invoice on its way through the checks. Each check reads
/// the raw record and fills in the parts it is responsible for.
#[derive(Clone, Debug)]
pub struct Draft {
    pub raw: OfflineInvoice,
    pub invoice_number: String,
    pub salesperson: Option<User>,
    pub lines: Vec<Line>,
    pub totals: InvoiceTotals,
    pub created_at: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn new(raw: OfflineInvoice) -> Self {
        let invoice_number = raw
            .invoice_number
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        Self {
            raw,
            invoice_number,
            salesperson: None,
            lines: Vec::new(),
            totals: InvoiceTotals::default(),
            created_at: None,
        }
    }

    /// Build the record to commit. `None` until a salesperson was resolved.
    pub fn to_new_invoice(&self, store: &Store, now: DateTime<Utc>) -> Option<NewInvoice> {
        let salesperson = self.salesperson.as_ref()?;
        let text = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or_default().to_string();
        Some(NewInvoice {
            store: store.id,
            invoice_number: self.invoice_number.clone(),
            salesperson: salesperson.id,
            items: self
                .lines
                .iter()
                .map(|line| NewInvoiceItem {
                    product: line.product.id,
                    product_name: line.product_name.clone(),
                    product_code: line.product_code.clone(),
                    quantity: line.quantity,
                    price: line.price,
                    total: line.total,
                })
                .collect(),
            totals: self.totals,
            customer_name: text(&self.raw.customer_name),
            customer_phone: text(&self.raw.customer_phone),
            customer_email: text(&self.raw.customer_email),
            notes: self.raw.notes.clone().unwrap_or_default(),
            sync_status: SyncStatus::Synced,
            synced_at: Some(now),
            local_id: self.raw.local_id.clone(),
            created_at: self.created_at.unwrap_or(now),
        })
    }
}

// ---------------------------------------------------------------------------
// CheckContext
// ---------------------------------------------------------------------------

/// What every check can see besides the draft.
pub struct CheckContext<'a> {
    pub db: &'a dyn PosStore,
    pub store: &'a Store,
    pub principal: &'a Principal,
    /// Invoice numbers already taken earlier in this batch.
    pub seen_numbers: &'a HashSet<String>,
}

// ---------------------------------------------------------------------------
// SyncCheck
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckDecision {
    Pass,
    Fail(FieldErrors),
}

impl CheckDecision {
    pub fn from_errors(errors: FieldErrors) -> Self {
        if errors.is_empty() {
            Self::Pass
        } else {
            Self::Fail(errors)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A single validation step for offline invoices.
///
/// Checks run in order and their failures are collected, so one response
/// tells the client everything wrong with a record. Object safe, so the
/// engine keeps them in a `Vec<Box<dyn SyncCheck>>`.
pub trait SyncCheck: Send + Sync {
    fn name(&self) -> &str;

    /// Skip this check once an earlier one has failed.
    fn needs_clean_record(&self) -> bool {
        false
    }

    /// Store errors abort the record; field problems go in the decision.
    fn evaluate(&self, draft: &mut Draft, ctx: &CheckContext<'_>) -> SyncResult<CheckDecision>;
}
