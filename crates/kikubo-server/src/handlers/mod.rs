//! Request handlers, one module per resource.

pub mod accounts;
pub mod catalog;
pub mod health;
pub mod invoices;
pub mod reports;
pub mod stores;
pub mod sync;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use kikubo_store::PosStore;
use kikubo_types::{FieldErrors, StoreId, UserId};

use crate::error::{ServerError, ServerResult};

/// Raw query string parameters.
pub type Params = HashMap<String, String>;

pub(crate) const REQUIRED: &str = "This field is required.";

/// Parse a path id. Anything unparseable is simply not found.
pub(crate) fn path_id<T: FromStr>(raw: &str) -> ServerResult<T> {
    raw.parse().map_err(|_| ServerError::not_found())
}

/// A non-empty, trimmed query value.
pub(crate) fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Trim an optional text input and check it against `max` characters.
pub(crate) fn text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max: usize,
) -> Option<String> {
    let value = value.map(|v| v.trim().to_string());
    if value.as_ref().is_some_and(|v| v.chars().count() > max) {
        errors.add(field, format!("Ensure this field has no more than {max} characters."));
    }
    value
}

/// Like [`text`] for a mandatory field: never blank, and present unless
/// the update is `partial`.
pub(crate) fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max: usize,
    partial: bool,
) -> Option<String> {
    match text(errors, field, value, max) {
        None if !partial => {
            errors.add(field, REQUIRED);
            None
        }
        Some(v) if v.is_empty() => {
            errors.add(field, "This field may not be blank.");
            None
        }
        other => other,
    }
}

/// Case-insensitive substring search over several fields.
pub(crate) fn matches_search(term: Option<&str>, fields: &[&str]) -> bool {
    match term {
        None => true,
        Some(term) => {
            let needle = term.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&needle))
        }
    }
}

/// Sort by an `ordering` parameter such as `-price`. Keys outside
/// `allowed` fall back to `default`.
pub(crate) fn apply_ordering<T>(
    items: &mut [T],
    ordering: Option<&str>,
    allowed: &[&str],
    default: &str,
    compare: impl Fn(&str, &T, &T) -> Ordering,
) {
    let key = ordering
        .filter(|k| allowed.contains(&k.trim_start_matches('-')))
        .unwrap_or(default);
    let field = key.trim_start_matches('-');
    if key.starts_with('-') {
        items.sort_by(|a, b| compare(field, b, a));
    } else {
        items.sort_by(|a, b| compare(field, a, b));
    }
}

/// Display names of everyone in `store`, for invoice listings.
pub(crate) fn user_names(db: &dyn PosStore, store: StoreId) -> ServerResult<HashMap<UserId, String>> {
    Ok(db
        .list_users(store)?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rules() {
        let mut errors = FieldErrors::new();
        assert_eq!(required_text(&mut errors, "name", Some(" Soap ".into()), 10, false), Some("Soap".into()));
        assert!(errors.is_empty());
        required_text(&mut errors, "name", None, 10, true);
        assert!(errors.is_empty());
        required_text(&mut errors, "name", Some("  ".into()), 10, true);
        required_text(&mut errors, "code", None, 10, false);
        required_text(&mut errors, "notes", Some("x".repeat(11)), 10, false);
        assert_eq!(errors.get("name").unwrap()[0], "This field may not be blank.");
        assert_eq!(errors.get("code").unwrap()[0], REQUIRED);
        assert!(errors.contains("notes"));
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(matches_search(Some("SOAP"), &["Bar soap", ""]));
        assert!(!matches_search(Some("rice"), &["Bar soap"]));
        assert!(matches_search(None, &[]));
    }

    #[test]
    fn ordering_falls_back_on_unknown_key() {
        let cmp = |_: &str, a: &i32, b: &i32| a.cmp(b);
        let mut items = vec![2, 3, 1];
        apply_ordering(&mut items, Some("-value"), &["value"], "value", cmp);
        assert_eq!(items, vec![3, 2, 1]);
        apply_ordering(&mut items, Some("bogus"), &["value"], "value", cmp);
        assert_eq!(items, vec![1, 2, 3]);
    }
}
