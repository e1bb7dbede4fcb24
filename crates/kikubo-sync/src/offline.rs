//! Wire shape of an invoice recorded on a disconnected client.
//!
//! Decoding is loose: every field is optional and identifiers
//! may arrive as strings or numbers. The checks decide what is missing.

use kikubo_types::Money;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OfflineInvoice {
    /// Client-side identifier, echoed back in the report.
    #[serde(default, rename = "id", deserialize_with = "lenient_string")]
    pub local_id: Option<String>,
    #[serde(default, rename = "createdAt", alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub salesperson: Option<String>,
    #[serde(default, rename = "salespersonName", alias = "salesperson_name")]
    pub salesperson_name: Option<String>,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub total: Option<Money>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Informational only; stored invoices are always `SYNCED`.
    #[serde(default, rename = "syncStatus", alias = "sync_status")]
    pub sync_status: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<OfflineItem>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OfflineItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub product: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub total: Option<Money>,
}

impl OfflineInvoice {
    /// Decode one batch element.
    pub fn decode(raw: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(raw)
    }
}

/// Identifiers for the report, read straight from the raw element so that
/// even undecodable records can be attributed.
pub fn raw_identity(raw: &Value) -> (Option<String>, Option<String>) {
    let text = |key: &str| match raw.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    (text("id"), text("invoice_number"))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected a string, found {other}"))),
    }
}

fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom("A valid integer is required.")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom("A valid integer is required.")),
        Some(_) => Err(de::Error::custom("A valid integer is required.")),
    }
}
