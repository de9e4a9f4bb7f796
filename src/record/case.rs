//! Key normalization from snake_case to lowerCamelCase

use serde_json::{Map, Value};

/// Convert one key to lowerCamelCase
///
/// The first word is kept as written. Each later word is capitalized:
/// first character upper, the rest lower. Keys without underscores are
/// returned unchanged.
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (index, word) in key.split('_').enumerate() {
        if index == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Normalize every top-level key of a field map
pub fn normalize_keys(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            if key.contains('_') {
                (snake_to_camel(&key), value)
            } else {
                (key, value)
            }
        })
        .collect()
}
