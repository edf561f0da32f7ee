//! PostgreSQL identifier and literal quoting.
//!
//! Literal quoting is injection-safe by construction: strings outside a
//! conservative safe character set are wrapped in a fixed dollar-quoted
//! delimiter so no escape processing applies, and NUL bytes are stripped
//! before quoting.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Timelike};
use regex::Regex;

const MAGIC_ESCAPE: &str = "$_P_$";

static SAFE_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^["/.,;:$%@!#^&*(){}\[\]|\\<>?~a-zA-Z0-9_\- ]+$"#).expect("safe chars regex")
});

static NEEDS_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]").expect("needs quote regex"));

static KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(USER|SELECT|INSERT|UPDATE|DELETE|FROM|WHERE|JOIN|LEFT|RIGHT|INNER|GROUP BY|ORDER BY|HAVING|AND|OR|CREATE|DROP|ALTER|TABLE|INDEX|ON|INTO|VALUES|SET|AS|DISTINCT|TYPE|DEFAULT|ORDER|GROUP|LIMIT|SUM|TOTAL|START|END|BEGIN|COMMIT|ROLLBACK|PRIMARY|AUTHORIZATION|BINARY)\b",
    )
    .expect("keywords regex")
});

/// Quote a string literal.
///
/// NUL bytes are stripped. Strings made only of safe characters are wrapped
/// in plain single quotes; anything else is dollar-quoted so the content
/// passes through without escape processing.
pub fn quote_string(val: &str) -> String {
    let cleaned: String;
    let val = if val.contains('\0') {
        cleaned = val.replace('\0', "");
        &cleaned
    } else {
        val
    };
    if val.is_empty() || SAFE_CHARACTERS.is_match(val) {
        format!("'{}'", val)
    } else {
        format!("{}{}{}", MAGIC_ESCAPE, val, MAGIC_ESCAPE)
    }
}

/// Quote a byte string as a hex-encoded bytea literal.
pub fn quote_bytes(buf: &[u8]) -> String {
    let mut out = String::with_capacity(buf.len() * 2 + 4);
    out.push_str("'\\x");
    for byte in buf {
        let _ = write!(out, "{:02x}", byte);
    }
    out.push('\'');
    out
}

/// Quote an identifier, but only when necessary.
///
/// An identifier containing characters outside `[a-z0-9_]`, or matching a
/// reserved keyword, is double-quoted with inner quotes doubled; anything
/// else is emitted bare.
pub fn quote_identifier(val: &str) -> String {
    if NEEDS_QUOTE.is_match(val) || KEYWORDS.is_match(val) {
        format!("\"{}\"", val.replace('"', "\"\""))
    } else {
        val.to_string()
    }
}

/// A typed value for literal rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'a str),
    Bytes(&'a [u8]),
    Timestamp(DateTime<FixedOffset>),
    TextList(&'a [String]),
}

/// Render a typed value as a SQL literal.
///
/// Integers render base-10, floats in their shortest round-trip form,
/// timestamps truncated to microseconds, and string slices JSON-stringified
/// then quoted through the safe string path.
pub fn quote_value(val: &SqlValue<'_>) -> String {
    match val {
        SqlValue::Null => "null".to_string(),
        SqlValue::Bool(v) => v.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Text(v) => quote_string(v),
        SqlValue::Bytes(v) => quote_bytes(v),
        SqlValue::Timestamp(ts) => {
            let truncated = ts
                .with_nanosecond(ts.nanosecond() / 1_000 * 1_000)
                .unwrap_or(*ts);
            format!("'{}'", truncated.format("%Y-%m-%d %H:%M:%S%.6f%::z"))
        }
        SqlValue::TextList(items) => {
            let json = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
            quote_string(&json)
        }
    }
}
