//! Deterministic normalization and hashing.
//!
//! Semantically identical input must always hash identically, so every
//! digest in the crate goes through these functions.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Normalize text before hashing.
///
/// - strips a leading byte-order mark
/// - unifies `\r\n` and `\r` line endings to `\n`
/// - removes trailing whitespace from every line
/// - trims leading and trailing blank space of the whole text
pub fn canonicalize(text: &str) -> String {
    let text = text.trim_start_matches('\u{feff}');
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    unified
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Serialize a value as JSON with object keys sorted at every depth and no
/// insignificant whitespace.
pub fn canonicalize_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// SHA-256 of the text, as 64 lower-case hex characters
pub fn compute_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
