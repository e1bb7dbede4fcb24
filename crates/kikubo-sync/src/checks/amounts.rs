use kikubo_types::{FieldErrors, InvoiceTotals, Money};

use super::REQUIRED;
use crate::check::{CheckContext, CheckDecision, Draft, SyncCheck};
use crate::error::SyncResult;

/// Client totals are present, non-negative, within the stored digit budget
/// and add up: `total == subtotal + tax - discount`. Discount defaults to
/// zero.
pub struct AmountsCheck;

impl SyncCheck for AmountsCheck {
    fn name(&self) -> &str {
        "amounts"
    }

    fn evaluate(&self, draft: &mut Draft, _ctx: &CheckContext<'_>) -> SyncResult<CheckDecision> {
        let raw = &draft.raw;
        let mut errors = FieldErrors::new();
        let mut field = |name: &str, value: Option<Money>, default: Option<Money>| {
            match value.or(default) {
                None => {
                    errors.add(name, REQUIRED);
                    Money::ZERO
                }
                Some(v) if v.is_negative() => {
                    errors.add(name, "Ensure this value is greater than or equal to 0.");
                    v
                }
                Some(v) if !v.fits_digits(Money::AMOUNT_DIGITS) => {
                    errors.add(
                        name,
                        format!(
                            "Ensure that there are no more than {} digits in total.",
                            Money::AMOUNT_DIGITS
                        ),
                    );
                    v
                }
                Some(v) => v,
            }
        };
        let totals = InvoiceTotals {
            subtotal: field("subtotal", raw.subtotal, None),
            tax: field("tax", raw.tax, None),
            discount: field("discount", raw.discount, Some(Money::ZERO)),
            total: field("total", raw.total, None),
        };
        if errors.is_empty() && !totals.is_consistent() {
            errors.add(
                "total",
                format!(
                    "Total {} does not equal subtotal + tax - discount ({} + {} - {}).",
                    totals.total, totals.subtotal, totals.tax, totals.discount
                ),
            );
        }
        if errors.is_empty() {
            draft.totals = totals;
        }
        Ok(CheckDecision::from_errors(errors))
    }
}
