use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{InvoiceId, InvoiceItemId, ProductId, StoreId, UserId};
use crate::money::{Money, Rate};

/// Where an invoice stands relative to the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Synced => "SYNCED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SYNCED" => Ok(Self::Synced),
            "FAILED" => Ok(Self::Failed),
            other => Err(TypeError::UnknownSyncStatus(other.to_string())),
        }
    }
}

/// One invoice line. Name and code are snapshots taken at sale time so
/// later catalog edits do not rewrite history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub product: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub store: StoreId,
    /// Unique within the store.
    pub invoice_number: String,
    pub salesperson: UserId,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub notes: String,
    pub sync_status: SyncStatus,
    pub synced_at: Option<DateTime<Utc>>,
    /// Identifier the offline client used before the invoice reached us.
    pub local_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            tax: self.tax,
            discount: self.discount,
            total: self.total,
        }
    }

    /// Recompute the amounts from the stored lines, keeping the discount.
    pub fn recalculate(&mut self, tax_rate: Rate) {
        let totals = InvoiceTotals::compute(self.items.iter().map(|i| i.total), self.discount, tax_rate);
        self.subtotal = totals.subtotal;
        self.tax = totals.tax;
        self.total = totals.total;
    }
}

/// The four amounts every invoice carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl InvoiceTotals {
    /// Server-side totals: tax is charged on the subtotal, discount is taken
    /// off the taxed amount.
    pub fn compute<I>(line_totals: I, discount: Money, tax_rate: Rate) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal: Money = line_totals.into_iter().sum();
        let tax = subtotal.apply_rate(tax_rate);
        Self {
            subtotal,
            tax,
            discount,
            total: subtotal + tax - discount,
        }
    }

    /// `total == subtotal + tax - discount`
    pub fn is_consistent(&self) -> bool {
        self.subtotal
            .checked_add(self.tax)
            .and_then(|v| v.checked_sub(self.discount))
            == Some(self.total)
    }

    pub fn has_negative(&self) -> bool {
        [self.subtotal, self.tax, self.discount, self.total]
            .iter()
            .any(Money::is_negative)
    }
}

/// Largest quantity a single invoice line may carry.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewInvoiceItem {
    pub product: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
}

/// A fully validated invoice waiting to be committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewInvoice {
    pub store: StoreId,
    pub invoice_number: String,
    pub salesperson: UserId,
    pub items: Vec<NewInvoiceItem>,
    pub totals: InvoiceTotals,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub notes: String,
    pub sync_status: SyncStatus,
    pub synced_at: Option<DateTime<Utc>>,
    pub local_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewInvoice {
    /// Requested quantity per product, summed across lines.
    pub fn quantities(&self) -> Result<BTreeMap<ProductId, i64>, TypeError> {
        let mut out = BTreeMap::new();
        for item in &self.items {
            let sum = out.entry(item.product).or_insert(0i64);
            *sum = sum.checked_add(item.quantity).ok_or(TypeError::Overflow)?;
        }
        Ok(out)
    }

    /// Assign identifiers and produce the stored record.
    pub fn into_invoice(self) -> Invoice {
        let now = Utc::now();
        let items = self
            .items
            .into_iter()
            .map(|item| InvoiceItem {
                id: InvoiceItemId::new(),
                product: item.product,
                product_name: item.product_name,
                product_code: item.product_code,
                quantity: item.quantity,
                price: item.price,
                total: item.total,
                created_at: now,
            })
            .collect();
        Invoice {
            id: InvoiceId::new(),
            store: self.store,
            invoice_number: self.invoice_number,
            salesperson: self.salesperson,
            items,
            subtotal: self.totals.subtotal,
            tax: self.totals.tax,
            discount: self.totals.discount,
            total: self.totals.total,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email,
            notes: self.notes,
            sync_status: self.sync_status,
            synced_at: self.synced_at,
            local_id: self.local_id,
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: ProductId, qty: i64, cents: i64) -> NewInvoiceItem {
        let price = Money::from_cents(cents);
        NewInvoiceItem {
            product,
            product_name: "Thing".into(),
            product_code: "T-1".into(),
            quantity: qty,
            price,
            total: price.times(qty).unwrap(),
        }
    }

    fn new_invoice(items: Vec<NewInvoiceItem>) -> NewInvoice {
        let totals = InvoiceTotals::compute(items.iter().map(|i| i.total), Money::ZERO, Rate::ZERO);
        NewInvoice {
            store: StoreId::new(),
            invoice_number: "INV-1".into(),
            salesperson: UserId::new(),
            items,
            totals,
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_email: String::new(),
            notes: String::new(),
            sync_status: SyncStatus::Synced,
            synced_at: None,
            local_id: Some("local-1".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn sync_status_wire_names() {
        assert_eq!(serde_json::to_string(&SyncStatus::Synced).unwrap(), "\"SYNCED\"");
        assert_eq!("pending".parse::<SyncStatus>().unwrap(), SyncStatus::Pending);
        assert!("DONE".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn compute_totals_with_tax_and_discount() {
        let totals = InvoiceTotals::compute(
            [Money::from_cents(1000), Money::from_cents(500)],
            Money::from_cents(100),
            Rate::parse("0.1").unwrap(),
        );
        assert_eq!(totals.subtotal, Money::from_cents(1500));
        assert_eq!(totals.tax, Money::from_cents(150));
        assert_eq!(totals.total, Money::from_cents(1550));
        assert!(totals.is_consistent());
        assert!(!totals.has_negative());
    }

    #[test]
    fn inconsistent_totals_detected() {
        let totals = InvoiceTotals {
            subtotal: Money::from_cents(1000),
            tax: Money::ZERO,
            discount: Money::ZERO,
            total: Money::from_cents(999),
        };
        assert!(!totals.is_consistent());
    }

    #[test]
    fn quantities_aggregate_repeated_products() {
        let a = ProductId::new();
        let b = ProductId::new();
        let inv = new_invoice(vec![item(a, 2, 100), item(b, 1, 100), item(a, 3, 100)]);
        let q = inv.quantities().unwrap();
        assert_eq!(q[&a], 5);
        assert_eq!(q[&b], 1);
    }

    #[test]
    fn quantity_sum_overflow_is_an_error() {
        let a = ProductId::new();
        let inv = new_invoice(vec![item(a, i64::MAX, 1), item(a, i64::MAX, 1)]);
        assert_eq!(inv.quantities(), Err(TypeError::Overflow));
    }

    #[test]
    fn into_invoice_keeps_lines_and_totals() {
        let a = ProductId::new();
        let inv = new_invoice(vec![item(a, 2, 250)]).into_invoice();
        assert_eq!(inv.item_count(), 1);
        assert_eq!(inv.items[0].total, Money::from_cents(500));
        assert_eq!(inv.total, Money::from_cents(500));
        assert_eq!(inv.local_id.as_deref(), Some("local-1"));
        assert!(inv.totals().is_consistent());
    }

    #[test]
    fn recalculate_uses_lines_and_keeps_discount() {
        let mut inv = new_invoice(vec![item(ProductId::new(), 2, 500), item(ProductId::new(), 1, 250)]).into_invoice();
        inv.discount = Money::from_cents(100);
        inv.recalculate(Rate::from_ten_thousandths(1000).unwrap());
        assert_eq!(inv.subtotal, Money::from_cents(1250));
        assert_eq!(inv.tax, Money::from_cents(125));
        assert_eq!(inv.total, Money::from_cents(1275));
        assert!(inv.totals().is_consistent());
    }
}
