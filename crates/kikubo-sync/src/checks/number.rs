use kikubo_types::FieldErrors;

use super::REQUIRED;
use crate::check::{CheckContext, CheckDecision, Draft, SyncCheck};
use crate::error::SyncResult;

pub const MAX_INVOICE_NUMBER_LEN: usize = 100;

/// Invoice numbers are present, short enough and unused in the store,
/// counting numbers committed earlier in the same batch.
pub struct InvoiceNumberCheck;

impl SyncCheck for InvoiceNumberCheck {
    fn name(&self) -> &str {
        "invoice_number"
    }

    fn evaluate(&self, draft: &mut Draft, ctx: &CheckContext<'_>) -> SyncResult<CheckDecision> {
        let number = draft.invoice_number.as_str();
        let mut errors = FieldErrors::new();
        if number.is_empty() {
            errors.add("invoice_number", REQUIRED);
        } else if number.chars().count() > MAX_INVOICE_NUMBER_LEN {
            errors.add(
                "invoice_number",
                "Ensure this field has no more than 100 characters.",
            );
        } else if ctx.seen_numbers.contains(number) {
            errors.add(
                "invoice_number",
                format!("Invoice number \"{number}\" appears more than once in this batch."),
            );
        } else if ctx.db.invoice_number_exists(ctx.store.id, number)? {
            errors.add(
                "invoice_number",
                format!("Invoice with number \"{number}\" already exists."),
            );
        }
        Ok(CheckDecision::from_errors(errors))
    }
}
