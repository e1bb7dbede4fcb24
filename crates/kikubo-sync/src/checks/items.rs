use kikubo_types::{FieldErrors, Money, ProductId, MAX_QUANTITY};

use crate::check::{CheckContext, CheckDecision, Draft, Line, SyncCheck};
use crate::error::SyncResult;

pub const MIN_PRICE: Money = Money::from_cents(1);

/// Every line names an active product of the store with a positive
/// quantity and price. A client line total is kept as sent; a missing one
/// becomes quantity x price. Resolved lines are stored on the draft.
pub struct ItemsCheck;

impl SyncCheck for ItemsCheck {
    fn name(&self) -> &str {
        "items"
    }

    fn evaluate(&self, draft: &mut Draft, ctx: &CheckContext<'_>) -> SyncResult<CheckDecision> {
        let items = draft.raw.items.clone().unwrap_or_default();
        if items.is_empty() {
            return Ok(CheckDecision::Fail(FieldErrors::single(
                "items",
                "At least one item is required.",
            )));
        }

        let mut errors = FieldErrors::new();
        let mut lines = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let n = index + 1;
            let mut bad = |message: String| errors.add("items", format!("Item {n}: {message}"));

            let quantity = match item.quantity {
                Some(q) if q > MAX_QUANTITY => {
                    bad(format!("Ensure quantity is less than or equal to {MAX_QUANTITY}."));
                    None
                }
                Some(q) if q >= 1 => Some(q),
                Some(_) => {
                    bad("Ensure quantity is greater than or equal to 1.".into());
                    None
                }
                None => {
                    bad("quantity is required.".into());
                    None
                }
            };
            let price = match item.price {
                Some(p) if !p.fits_digits(Money::PRICE_DIGITS) => {
                    bad(format!(
                        "Ensure price has no more than {} digits in total.",
                        Money::PRICE_DIGITS
                    ));
                    None
                }
                Some(p) if p >= MIN_PRICE => Some(p),
                Some(_) => {
                    bad("Ensure price is greater than or equal to 0.01.".into());
                    None
                }
                None => {
                    bad("price is required.".into());
                    None
                }
            };

            let raw_product = item.product.as_deref().map(str::trim).unwrap_or_default();
            let product = if raw_product.is_empty() {
                bad("product is required.".into());
                None
            } else {
                match ProductId::parse(raw_product) {
                    Ok(id) => {
                        let found = ctx
                            .db
                            .get_product(id)?
                            .filter(|p| p.is_sellable_in(ctx.store.id));
                        if found.is_none() {
                            bad(format!("product \"{raw_product}\" is not available in this store."));
                        }
                        found
                    }
                    Err(_) => {
                        bad(format!("\"{raw_product}\" is not a valid product id."));
                        None
                    }
                }
            };

            let (Some(product), Some(quantity), Some(price)) = (product, quantity, price) else {
                continue;
            };
            let total = match item.total {
                Some(total) if total.is_negative() => {
                    bad("Ensure total is greater than or equal to 0.".into());
                    continue;
                }
                Some(total) => total,
                None => match price.times(quantity) {
                    Ok(total) => total,
                    Err(_) => {
                        bad("line total is out of range.".into());
                        continue;
                    }
                },
            };
            if !total.fits_digits(Money::AMOUNT_DIGITS) {
                bad(format!(
                    "Ensure total has no more than {} digits in total.",
                    Money::AMOUNT_DIGITS
                ));
                continue;
            }
            let name = item.product_name.as_deref().map(str::trim).unwrap_or_default();
            let code = item.product_code.as_deref().map(str::trim).unwrap_or_default();
            lines.push(Line {
                product_name: if name.is_empty() { product.name.clone() } else { name.to_string() },
                product_code: if code.is_empty() { product.code.clone() } else { code.to_string() },
                product,
                quantity,
                price,
                total,
            });
        }

        if errors.is_empty() {
            draft.lines = lines;
        } else {
            tracing::debug!(invoice = %draft.invoice_number, %errors, "item check failed");
        }
        Ok(CheckDecision::from_errors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixture::Fixture;
    use crate::offline::{OfflineInvoice, OfflineItem};

    fn draft(items: Vec<OfflineItem>) -> Draft {
        Draft::new(OfflineInvoice {
            items: Some(items),
            ..Default::default()
        })
    }

    fn item(product: String, quantity: i64, price: i64) -> OfflineItem {
        OfflineItem {
            product: Some(product),
            quantity: Some(quantity),
            price: Some(Money::from_cents(price)),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_lines_with_catalog_defaults() {
        let fx = Fixture::new();
        let mut d = draft(vec![item(fx.soap.id.to_string(), 2, 250)]);
        let decision = ItemsCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap();
        assert!(decision.is_pass());
        assert_eq!(d.lines.len(), 1);
        assert_eq!(d.lines[0].total, Money::from_cents(500));
        assert_eq!(d.lines[0].product_code, "SOAP-1");
    }

    #[test]
    fn empty_items_fail() {
        let fx = Fixture::new();
        let CheckDecision::Fail(errors) =
            ItemsCheck.evaluate(&mut draft(vec![]), &fx.ctx(&fx.seller)).unwrap()
        else {
            panic!("expected failure");
        };
        assert_eq!(errors.first_message(), Some("At least one item is required."));
    }

    #[test]
    fn collects_every_bad_line() {
        let fx = Fixture::new();
        let mut d = draft(vec![
            item(fx.soap.id.to_string(), 0, 250),
            item(ProductId::new().to_string(), 1, 250),
            item(fx.soap.id.to_string(), 1, 0),
        ]);
        let CheckDecision::Fail(errors) = ItemsCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap()
        else {
            panic!("expected failure");
        };
        let messages = errors.get("items").unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("Item 1:"));
        assert!(messages[1].contains("not available"));
        assert!(d.lines.is_empty());
    }

    #[test]
    fn client_line_total_is_kept() {
        let fx = Fixture::new();
        let mut line = item(fx.soap.id.to_string(), 2, 250);
        line.total = Some(Money::from_cents(400));
        let mut d = draft(vec![line]);
        assert!(ItemsCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap().is_pass());
        assert_eq!(d.lines[0].total, Money::from_cents(400));
    }

    #[test]
    fn negative_line_total_fails() {
        let fx = Fixture::new();
        let mut line = item(fx.soap.id.to_string(), 2, 250);
        line.total = Some(Money::from_cents(-1));
        let CheckDecision::Fail(errors) =
            ItemsCheck.evaluate(&mut draft(vec![line]), &fx.ctx(&fx.seller)).unwrap()
        else {
            panic!("expected failure");
        };
        assert_eq!(
            errors.first_message(),
            Some("Item 1: Ensure total is greater than or equal to 0.")
        );
    }

    #[test]
    fn quantity_price_and_total_are_bounded() {
        let fx = Fixture::new();
        let soap = fx.soap.id.to_string();
        let mut huge_total = item(soap.clone(), 1, 250);
        huge_total.total = Some(Money::from_cents(1_000_000_000_000));
        let mut d = draft(vec![
            item(soap.clone(), i64::MAX, 1),
            item(soap.clone(), 1, 10_000_000_000),
            huge_total,
        ]);
        let CheckDecision::Fail(errors) = ItemsCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap()
        else {
            panic!("expected failure");
        };
        let messages = errors.get("items").unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], "Item 1: Ensure quantity is less than or equal to 2147483647.");
        assert_eq!(messages[1], "Item 2: Ensure price has no more than 10 digits in total.");
        assert_eq!(messages[2], "Item 3: Ensure total has no more than 12 digits in total.");
    }
}
