//! Canonical JSON rendering.
//!
//! `serde_json::Map` iterates in insertion order when the `preserve_order`
//! feature is enabled anywhere in the dependency graph, so plain
//! `to_string` is not a stable cache key. Everything that ends up inside a key
//! goes through [`canonical_json`] instead.

use serde_json::Value;

/// Render a JSON value with object keys sorted at every nesting level.
///
/// Arrays keep their element order. Output is compact (no whitespace).
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Display on a string Value yields the escaped JSON literal
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
