use kikubo_types::{FieldErrors, UserId};

use super::REQUIRED;
use crate::check::{CheckContext, CheckDecision, Draft, SyncCheck};
use crate::error::SyncResult;

/// The salesperson is an active member of the store. Salespeople may only
/// upload their own sales; owners and managers may upload for anyone in
/// the store.
pub struct SalespersonCheck;

impl SyncCheck for SalespersonCheck {
    fn name(&self) -> &str {
        "salesperson"
    }

    fn evaluate(&self, draft: &mut Draft, ctx: &CheckContext<'_>) -> SyncResult<CheckDecision> {
        let raw = draft.raw.salesperson.as_deref().map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(CheckDecision::Fail(FieldErrors::single("salesperson", REQUIRED)));
        }
        let Ok(id) = UserId::parse(raw) else {
            return Ok(CheckDecision::Fail(FieldErrors::single(
                "salesperson",
                format!("\"{raw}\" is not a valid UUID."),
            )));
        };
        let user = ctx
            .db
            .get_user(id)?
            .filter(|u| u.is_active && u.belongs_to(ctx.store.id));
        let Some(user) = user else {
            return Ok(CheckDecision::Fail(FieldErrors::single(
                "salesperson",
                format!("\"{raw}\" is not an active user of this store."),
            )));
        };
        if !ctx.principal.sees_all_sales() && user.id != ctx.principal.id() {
            return Ok(CheckDecision::Fail(FieldErrors::single(
                "salesperson",
                "You can only sync your own invoices.",
            )));
        }
        draft.salesperson = Some(user);
        Ok(CheckDecision::Pass)
    }
}
