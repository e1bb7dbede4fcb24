use chrono::{DateTime, Days, NaiveDate, Utc};
use kikubo_types::{
    Invoice, InvoiceId, InvoiceItem, InvoiceItemId, Money, ProductId, StoreId, SyncStatus, UserId,
};

/// Noon UTC, `days_ago` days before `today`.
pub fn sold_at(today: NaiveDate, days_ago: u64) -> DateTime<Utc> {
    today
        .checked_sub_days(Days::new(days_ago))
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
}

/// A synced invoice with `(name, quantity, unit price in cents)` lines.
/// Products are identified by name so lines with the same name aggregate.
pub fn invoice(store: StoreId, salesperson: UserId, at: DateTime<Utc>, lines: &[(&str, i64, i64)]) -> Invoice {
    let items: Vec<InvoiceItem> = lines
        .iter()
        .map(|(name, quantity, cents)| InvoiceItem {
            id: InvoiceItemId::new(),
            product: product_id(name),
            product_name: name.to_string(),
            product_code: name.to_uppercase(),
            quantity: *quantity,
            price: Money::from_cents(*cents),
            total: Money::from_cents(cents * quantity),
            created_at: at,
        })
        .collect();
    let total: Money = items.iter().map(|i| i.total).sum();
    Invoice {
        id: InvoiceId::new(),
        store,
        invoice_number: format!("T-{}", InvoiceId::new()),
        salesperson,
        items,
        subtotal: total,
        tax: Money::ZERO,
        discount: Money::ZERO,
        total,
        customer_name: String::new(),
        customer_phone: String::new(),
        customer_email: String::new(),
        notes: String::new(),
        sync_status: SyncStatus::Synced,
        synced_at: Some(at),
        local_id: None,
        created_at: at,
        updated_at: at,
    }
}

fn product_id(name: &str) -> ProductId {
    let mut bytes = [0u8; 16];
    for (slot, b) in bytes.iter_mut().zip(name.bytes()) {
        *slot = b;
    }
    ProductId::from_uuid(uuid::Uuid::from_bytes(bytes))
}
