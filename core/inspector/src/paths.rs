//! Change-path tracking for transient visual emphasis.
//!
//! Returns the flat set of dot-paths that differ between the previous and
//! current snapshot. Unlike the diff module it carries no value payloads,
//! and it does recurse into array elements (with index-based paths),
//! including elements that are themselves plain objects. Both share the
//! same structural-equality core.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::diff::{join_path, structural_eq, union_keys};

/// Maximum nesting depth the tracker descends into.
pub const TRACK_DEPTH_LIMIT: usize = 10;

/// Dot-paths that changed between `prev` and `next`. A missing previous
/// snapshot (first observation) yields an empty set, never an error.
pub fn changed_paths(prev: Option<&Value>, next: &Value) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    if let Some(prev) = prev {
        collect(prev, next, "", 0, &mut paths);
    }
    paths
}

fn collect(prev: &Value, next: &Value, path: &str, depth: usize, out: &mut BTreeSet<String>) {
    if depth >= TRACK_DEPTH_LIMIT {
        return;
    }
    if structural_eq(prev, next) {
        return;
    }

    match (prev, next) {
        (Value::Object(prev_map), Value::Object(next_map)) => {
            for key in union_keys(prev_map, next_map) {
                let child = join_path(path, key);
                match (prev_map.get(key), next_map.get(key)) {
                    (Some(a), Some(b)) => collect(a, b, &child, depth + 1, out),
                    (Some(_), None) | (None, Some(_)) => {
                        out.insert(child);
                    }
                    (None, None) => {}
                }
            }
        }
        (Value::Array(prev_items), Value::Array(next_items)) => {
            let longest = prev_items.len().max(next_items.len());
            for index in 0..longest {
                let child = join_path(path, &index.to_string());
                match (prev_items.get(index), next_items.get(index)) {
                    (Some(a), Some(b)) => collect(a, b, &child, depth + 1, out),
                    _ => {
                        out.insert(child);
                    }
                }
            }
        }
        _ => {
            out.insert(path.to_string());
        }
    }
}
