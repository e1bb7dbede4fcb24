use chrono::{DateTime, NaiveDateTime, Utc};
use kikubo_auth::account::is_valid_email;
use kikubo_types::FieldErrors;

use crate::check::{CheckContext, CheckDecision, Draft, SyncCheck};
use crate::error::SyncResult;

const MAX_CUSTOMER_NAME: usize = 200;
const MAX_CUSTOMER_PHONE: usize = 20;
const MAX_CUSTOMER_EMAIL: usize = 254;

/// Optional metadata: client timestamp and customer contact fields.
pub struct DetailsCheck;

impl SyncCheck for DetailsCheck {
    fn name(&self) -> &str {
        "details"
    }

    fn evaluate(&self, draft: &mut Draft, _ctx: &CheckContext<'_>) -> SyncResult<CheckDecision> {
        let mut errors = FieldErrors::new();

        if let Some(raw) = draft.raw.created_at.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            match parse_client_time(raw) {
                Some(at) => draft.created_at = Some(at),
                None => errors.add("createdAt", "Datetime has wrong format."),
            }
        }

        let limits = [
            ("customer_name", &draft.raw.customer_name, MAX_CUSTOMER_NAME),
            ("customer_phone", &draft.raw.customer_phone, MAX_CUSTOMER_PHONE),
            ("customer_email", &draft.raw.customer_email, MAX_CUSTOMER_EMAIL),
        ];
        for (field, value, max) in limits {
            if value.as_deref().map_or(0, |v| v.trim().chars().count()) > max {
                errors.add(field, format!("Ensure this field has no more than {max} characters."));
            }
        }

        let email = draft.raw.customer_email.as_deref().map(str::trim).unwrap_or_default();
        if !email.is_empty() && !is_valid_email(email) {
            errors.add("customer_email", "Enter a valid email address.");
        }

        Ok(CheckDecision::from_errors(errors))
    }
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
pub fn parse_client_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixture::Fixture;
    use crate::offline::OfflineInvoice;
    use chrono::TimeZone;

    #[test]
    fn client_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_client_time("2024-03-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_client_time("2024-03-01T12:30:00+03:00"), Some(expected));
        assert_eq!(parse_client_time("2024-03-01T09:30:00.000Z"), Some(expected));
        assert_eq!(parse_client_time("2024-03-01T09:30:00"), Some(expected));
        assert_eq!(parse_client_time("yesterday"), None);
    }

    #[test]
    fn bad_timestamp_and_email() {
        let fx = Fixture::new();
        let mut d = Draft::new(OfflineInvoice {
            created_at: Some("01/03/2024".into()),
            customer_email: Some("nope".into()),
            ..Default::default()
        });
        let CheckDecision::Fail(errors) = DetailsCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap()
        else {
            panic!("expected failure");
        };
        assert_eq!(errors.get("createdAt").unwrap(), ["Datetime has wrong format."]);
        assert!(errors.contains("customer_email"));
    }

    #[test]
    fn empty_details_pass() {
        let fx = Fixture::new();
        let mut d = Draft::new(OfflineInvoice::default());
        assert!(DetailsCheck.evaluate(&mut d, &fx.ctx(&fx.seller)).unwrap().is_pass());
        assert!(d.created_at.is_none());
    }
}
