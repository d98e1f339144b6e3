//! Token claim rows for the user-info view.

use serde_json::Value;

use crate::provider::TokenClaims;

/// Timestamp and replay claims that are not shown.
const HIDDEN_CLAIMS: &[&str] = &["exp", "iat", "auth_time", "jti"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRow {
    pub key: String,
    pub value: String,
}

/// Displayable claims, sorted by key.
pub fn claim_rows(claims: &TokenClaims) -> Vec<ClaimRow> {
    claims
        .iter()
        .filter(|(key, _)| !HIDDEN_CLAIMS.contains(&key.as_str()))
        .map(|(key, value)| ClaimRow {
            key: key.clone(),
            value: format_claim_value(value),
        })
        .collect()
}

/// Arrays are comma-joined, objects pretty-printed, scalars shown as-is.
pub fn format_claim_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(format_array_item)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_array_item(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
