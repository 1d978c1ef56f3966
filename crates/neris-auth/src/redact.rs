//! Masking of credentials in debug records.

use serde_json::Value;

/// Replacement text for secrets.
pub const MASK: &str = "***";

/// JSON keys whose string values are credentials.
const SECRET_KEYS: &[&str] = &[
    "access_token",
    "refresh_token",
    "id_token",
    "session",
    "password",
    "client_secret",
];

/// Mask credential values anywhere in a JSON document.
pub fn redact_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if val.is_string() && SECRET_KEYS.contains(&key.as_str()) {
                    *val = Value::String(MASK.to_string());
                } else {
                    redact_json(val);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json),
        _ => {}
    }
}

/// Mask the credential part of an `Authorization` header value, keeping
/// the scheme.
pub fn mask_authorization(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, _)) => format!("{scheme} {MASK}"),
        None => MASK.to_string(),
    }
}
