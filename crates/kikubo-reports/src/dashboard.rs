use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};
use kikubo_types::{Invoice, Money, Product};
use serde::{Deserialize, Serialize};

use crate::range::DateRange;

/// Headline numbers for the owner's home screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub today_sales: Money,
    pub invoice_count: usize,
    /// Best seller today by quantity, or `N/A`.
    pub top_product: String,
    pub active_salespeople: usize,
    pub week_sales: Money,
    pub month_sales: Money,
    pub low_stock_products: usize,
}

/// `invoices` must already be limited to synced invoices of one store.
pub fn dashboard(invoices: &[Invoice], products: &[Product], today: NaiveDate) -> DashboardStats {
    let today_range = DateRange { start: today, end: today };
    let since = |days: u64| DateRange {
        start: today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN),
        end: NaiveDate::MAX,
    };
    let sum_in = |range: DateRange| -> Money {
        invoices
            .iter()
            .filter(|i| range.contains(i.created_at))
            .map(|i| i.total)
            .sum()
    };

    let todays: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| today_range.contains(i.created_at))
        .collect();

    let mut sold: BTreeMap<&str, i64> = BTreeMap::new();
    for item in todays.iter().flat_map(|i| &i.items) {
        let quantity = sold.entry(item.product_name.as_str()).or_insert(0);
        *quantity = quantity.saturating_add(item.quantity);
    }
    // Ties go to the alphabetically first name.
    let top_product = sold
        .into_iter()
        .fold(None::<(&str, i64)>, |best, (name, qty)| match best {
            Some((_, top)) if top >= qty => best,
            _ => Some((name, qty)),
        })
        .map_or_else(|| "N/A".to_string(), |(name, _)| name.to_string());

    DashboardStats {
        today_sales: todays.iter().map(|i| i.total).sum(),
        invoice_count: todays.len(),
        top_product,
        active_salespeople: todays.iter().map(|i| i.salesperson).collect::<HashSet<_>>().len(),
        week_sales: sum_in(since(7)),
        month_sales: sum_in(since(30)),
        low_stock_products: products.iter().filter(|p| p.is_active && p.is_low_stock()).count(),
    }
}
