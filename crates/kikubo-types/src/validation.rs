use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Validation messages keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`, which is the error body
/// clients already parse.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field shorthand.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// First message overall, for one-line log output.
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("items", "At least one item is required.");
        errors.add("items", "Quantity must be at least 1.");
        errors.add("total", "Total does not match.");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("items").map(<[String]>::len), Some(2));
        assert_eq!(
            errors.to_string(),
            "items: At least one item is required.; items: Quantity must be at least 1.; total: Total does not match."
        );
    }

    #[test]
    fn wire_format_is_plain_map() {
        let errors = FieldErrors::single("email", "A user with this email already exists.");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"email": ["A user with this email already exists."]})
        );
    }

    #[test]
    fn into_result() {
        assert_eq!(FieldErrors::new().into_result(5), Ok(5));
        assert!(FieldErrors::single("a", "b").into_result(5).is_err());
    }

    #[test]
    fn extend_merges_fields() {
        let mut a = FieldErrors::single("x", "one");
        let mut b = FieldErrors::single("x", "two");
        b.add("y", "three");
        a.extend(b);
        assert_eq!(a.get("x").unwrap(), ["one".to_string(), "two".to_string()]);
        assert!(a.contains("y"));
        assert_eq!(a.first_message(), Some("one"));
    }
}
