use std::collections::BTreeMap;

use kikubo_types::{FieldErrors, ProductId};

use crate::check::{CheckContext, CheckDecision, Draft, SyncCheck};
use crate::error::SyncResult;

/// Requested quantity per product, summed over the lines, fits in stock.
///
/// Uses the stock read by the item check. The commit re-checks under the
/// write lock, which catches stock consumed by earlier invoices of the
/// same batch.
pub struct StockCheck;

impl SyncCheck for StockCheck {
    fn name(&self) -> &str {
        "stock"
    }

    fn needs_clean_record(&self) -> bool {
        true
    }

    fn evaluate(&self, draft: &mut Draft, _ctx: &CheckContext<'_>) -> SyncResult<CheckDecision> {
        let mut requested: BTreeMap<ProductId, (Option<i64>, usize)> = BTreeMap::new();
        for (index, line) in draft.lines.iter().enumerate() {
            let entry = requested.entry(line.product.id).or_insert((Some(0), index));
            entry.0 = entry.0.and_then(|sum| sum.checked_add(line.quantity));
        }
        let mut errors = FieldErrors::new();
        for (quantity, index) in requested.into_values() {
            let product = &draft.lines[index].product;
            match quantity {
                None => errors.add(
                    "items",
                    format!("Requested quantity for {} is out of range.", product.code),
                ),
                Some(quantity) if quantity > product.stock => errors.add(
                    "items",
                    format!(
                        "Insufficient stock for {}. Available: {}, Requested: {}",
                        product.code, product.stock, quantity
                    ),
                ),
                Some(_) => {}
            }
        }
        Ok(CheckDecision::from_errors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Line;
    use crate::checks::fixture::Fixture;
    use crate::offline::OfflineInvoice;
    use kikubo_types::Money;

    fn line(fx: &Fixture, quantity: i64) -> Line {
        Line {
            product: fx.soap.clone(),
            product_name: "Soap".into(),
            product_code: "SOAP-1".into(),
            quantity,
            price: Money::from_cents(250),
            total: Money::from_cents(250).times(quantity).unwrap_or_default(),
        }
    }

    #[test]
    fn quantities_are_aggregated_per_product() {
        let fx = Fixture::new();
        let mut d = Draft::new(OfflineInvoice::default());
        d.lines = vec![line(&fx, 6), line(&fx, 4)];
        assert!(StockCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap().is_pass());

        d.lines.push(line(&fx, 1));
        let CheckDecision::Fail(errors) = StockCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap()
        else {
            panic!("expected failure");
        };
        assert_eq!(
            errors.first_message(),
            Some("Insufficient stock for SOAP-1. Available: 10, Requested: 11")
        );
    }

    #[test]
    fn overflowing_quantity_sum_fails_instead_of_wrapping() {
        let fx = Fixture::new();
        let mut d = Draft::new(OfflineInvoice::default());
        d.lines = vec![line(&fx, i64::MAX), line(&fx, i64::MAX)];
        let CheckDecision::Fail(errors) = StockCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap()
        else {
            panic!("expected failure");
        };
        assert_eq!(
            errors.first_message(),
            Some("Requested quantity for SOAP-1 is out of range.")
        );
    }
}
