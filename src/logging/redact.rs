//! Secret redaction for anything that leaves the process.
//!
//! Two rules are applied:
//! - any run of 20 or more hexadecimal characters inside a string is treated as
//!   a token and replaced with [`REDACTED`];
//! - any object field whose name contains `token`, `key`, `password`, `secret`
//!   or `credential` (case-insensitive) has its whole value replaced.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// The sentinel that replaces redacted content.
pub const REDACTED: &str = "[REDACTED]";

/// Default limit for [`truncate_for_log`].
pub const DEFAULT_TRUNCATE_LENGTH: usize = 2000;

static HEX_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{20,}").expect("hex run pattern is valid")
});

static SENSITIVE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)token|key|password|secret|credential").expect("sensitive key pattern is valid")
});

/// Replaces every hex run of 20+ characters in `text`.
///
/// Returns the input borrowed when nothing matched.
pub fn redact_str(text: &str) -> Cow<'_, str> {
    HEX_RUN.replace_all(text, REDACTED)
}

/// Returns `true` when a field with this name must never be shown.
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEY.is_match(key)
}

/// Returns a redacted copy of `value`.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_str(s).into_owned()),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (key, field) in fields {
                let redacted = if is_sensitive_key(key) {
                    Value::String(REDACTED.to_string())
                } else {
                    redact(field)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

/// Serializes `redact(value)` for a human-facing debug line.
///
/// Output longer than `max_length` characters is cut and suffixed with the
/// number of characters left out.
pub fn truncate_for_log(value: &Value, max_length: usize) -> String {
    let text = redact(value).to_string();
    let total = text.chars().count();
    if total <= max_length {
        return text;
    }

    let cut = text
        .char_indices()
        .nth(max_length)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    format!("{}... [truncated {} chars]", &text[..cut], total - max_length)
}
