//! Stock reservation shared by every backend's `commit_invoice`.

use std::collections::BTreeMap;

use kikubo_types::{NewInvoice, Product, ProductId};

use crate::error::{StoreError, StoreResult};

/// New stock level per product once the invoice is applied.
pub(crate) type StockPlan = BTreeMap<ProductId, i64>;

/// Check every product on the invoice and compute the post-sale stock.
///
/// `lookup` reads the current product row inside the caller's transaction
/// or write lock.
pub(crate) fn plan_stock<F>(invoice: &NewInvoice, mut lookup: F) -> StoreResult<StockPlan>
where
    F: FnMut(ProductId) -> StoreResult<Option<Product>>,
{
    let quantities = invoice
        .quantities()
        .map_err(|_| StoreError::QuantityOutOfRange { product: None })?;
    let mut plan = StockPlan::new();
    for (product_id, requested) in quantities {
        if requested < 1 {
            return Err(StoreError::QuantityOutOfRange {
                product: Some(product_id),
            });
        }
        let product = lookup(product_id)?
            .filter(|p| p.is_sellable_in(invoice.store))
            .ok_or(StoreError::ProductUnavailable {
                product: product_id,
            })?;
        if requested > product.stock {
            return Err(StoreError::InsufficientStock {
                product: product_id,
                code: product.code,
                available: product.stock,
                requested,
            });
        }
        plan.insert(product_id, product.stock - requested);
    }
    Ok(plan)
}
