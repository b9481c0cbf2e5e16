//! Structural diffing between resource configurations.
//!
//! This is the heart of revision detection. Given the latest Durable
//! revision and an incoming Current record, the differ decides whether the
//! change is material enough to append a new revision.
//!
//! # Algorithm
//!
//! 1. Remove every excluded (ephemeral) path from both sides
//! 2. Canonicalize: arrays sort into multiset order, objects compare by key
//! 3. Compare the canonical forms for equality
//!
//! The result is pure and deterministic: identical inputs give identical
//! verdicts regardless of key or element iteration order.

use serde_json::Value;

/// Paths that never constitute a material change on their own: the record
/// schema version and the version marker emitted by describe calls.
pub const EPHEMERAL_PATHS: &[&str] = &["version", "configuration._version"];

/// Decide whether `current` differs materially from `previous`.
///
/// `exclude_paths` are dotted paths (`configuration._version`,
/// `configuration.Grants.0`) removed from both sides before comparing.
/// Arrays compare as unordered multisets; scalars by standard equality.
pub fn has_material_change(previous: &Value, current: &Value, exclude_paths: &[&str]) -> bool {
    normalize(previous, exclude_paths) != normalize(current, exclude_paths)
}

/// Produce the canonical comparison form of a value.
fn normalize(value: &Value, exclude_paths: &[&str]) -> Value {
    let mut value = value.clone();
    for path in exclude_paths {
        remove_path(&mut value, path);
    }
    canonicalize(value)
}

/// Remove a single dotted path. Segments index into objects by key and into
/// arrays by position. Missing segments are a no-op.
fn remove_path(value: &mut Value, path: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    remove_segments(value, &segments);
}

fn remove_segments(value: &mut Value, segments: &[&str]) {
    let (head, rest) = match segments.split_first() {
        Some(parts) => parts,
        None => return,
    };

    match value {
        Value::Object(map) => {
            if rest.is_empty() {
                map.remove(*head);
            } else if let Some(child) = map.get_mut(*head) {
                remove_segments(child, rest);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if rest.is_empty() {
                    if index < items.len() {
                        items.remove(index);
                    }
                } else if let Some(child) = items.get_mut(index) {
                    remove_segments(child, rest);
                }
            }
        }
        _ => {}
    }
}

/// Recursively sort arrays by their serialized form so that element order
/// cannot influence equality. Objects already compare key-wise.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut items: Vec<Value> = items.into_iter().map(canonicalize).collect();
            items.sort_by_cached_key(|v| v.to_string());
            Value::Array(items)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect(),
        ),
        other => other,
    }
}
