//! Value literals for generated SQL.
//!
//! Values are interpolated into statement text as double-quoted literals,
//! never bound as parameters. An embedded `"` is doubled so a value cannot
//! end its own literal; nothing else is escaped. Do not feed untrusted input
//! through the chain builder without validating it first.

use serde_json::Value;

/// Render a value as a SQL literal.
///
/// - strings and numbers: `"text"`
/// - booleans: `1` / `0`
/// - null: `NULL`
/// - arrays/objects: their JSON text, quoted
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::String(s) => quote_text(s),
        Value::Number(n) => quote_text(&n.to_string()),
        other => quote_text(&other.to_string()),
    }
}

/// Render a value list as `"a","b",...`.
pub fn quote_literal_list<'a>(values: impl IntoIterator<Item = &'a Value>) -> String {
    values
        .into_iter()
        .map(quote_literal)
        .collect::<Vec<_>>()
        .join(",")
}

fn quote_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}
