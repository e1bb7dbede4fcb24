use std::collections::HashMap;

use kikubo_types::{Invoice, Money, Product, ProductId};
use serde::{Deserialize, Serialize};

use crate::range::DateRange;

pub const DEFAULT_PRODUCT_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub quantity_sold: i64,
    pub total_revenue: Money,
}

/// Units and revenue per product inside `range`, most sold first.
///
/// Names come from the current catalog; the line snapshot is used for
/// products no longer in it.
pub fn product_sales(
    invoices: &[Invoice],
    catalog: &[Product],
    range: DateRange,
    limit: usize,
) -> Vec<ProductSales> {
    let mut rows: HashMap<ProductId, ProductSales> = HashMap::new();
    let items = invoices
        .iter()
        .filter(|i| range.contains(i.created_at))
        .flat_map(|i| &i.items);
    for item in items {
        let row = rows.entry(item.product).or_insert_with(|| {
            let current = catalog.iter().find(|p| p.id == item.product);
            ProductSales {
                product_id: item.product,
                product_name: current.map_or_else(|| item.product_name.clone(), |p| p.name.clone()),
                product_code: current.map_or_else(|| item.product_code.clone(), |p| p.code.clone()),
                quantity_sold: 0,
                total_revenue: Money::ZERO,
            }
        });
        row.quantity_sold = row.quantity_sold.saturating_add(item.quantity);
        row.total_revenue += item.total;
    }

    let mut rows: Vec<ProductSales> = rows.into_values().collect();
    rows.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| a.product_code.cmp(&b.product_code))
    });
    rows.truncate(limit);
    rows
}

/// Active products at or below their low-stock threshold, emptiest first.
pub fn low_stock(catalog: &[Product]) -> Vec<Product> {
    let mut rows: Vec<Product> = catalog
        .iter()
        .filter(|p| p.is_active && p.is_low_stock())
        .cloned()
        .collect();
    rows.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
    rows
}
