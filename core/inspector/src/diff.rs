//! Structural diff between two successive state snapshots.
//!
//! Produces an ordered list of changed-path records with before/after
//! values. Arrays are deliberately reported at the element level only: a
//! changed shared index yields a single `modified` record with no value
//! payload, never an element-internal diff. Recursion is bounded so cyclic
//! or pathological inputs cannot blow the stack; differences past the bound
//! are silently not reported.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum object-nesting depth the diff descends into.
pub const DIFF_DEPTH_LIMIT: usize = 8;

/// One changed path. `None` on a value side means the key was absent there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_value: Option<Value>,
    /// Set for changed array elements, which carry no value payload.
    #[serde(default)]
    pub modified: bool,
}

/// Diffs two mapping-like snapshots. Non-object roots contribute no keys,
/// so two non-object inputs produce an empty diff.
pub fn diff(prev: &Value, next: &Value) -> Vec<ChangeRecord> {
    let mut records = Vec::new();
    diff_level(prev, next, "", 0, &mut records);
    records
}

fn diff_level(prev: &Value, next: &Value, prefix: &str, depth: usize, out: &mut Vec<ChangeRecord>) {
    if depth >= DIFF_DEPTH_LIMIT {
        return;
    }

    let empty = Map::new();
    let prev_map = prev.as_object().unwrap_or(&empty);
    let next_map = next.as_object().unwrap_or(&empty);

    for key in union_keys(prev_map, next_map) {
        let path = join_path(prefix, key);
        match (prev_map.get(key), next_map.get(key)) {
            (Some(a), Some(b)) => {
                if structural_eq(a, b) {
                    continue;
                }
                match (a, b) {
                    (Value::Object(_), Value::Object(_)) => {
                        diff_level(a, b, &path, depth + 1, out);
                    }
                    (Value::Array(x), Value::Array(y)) => diff_array(x, y, &path, out),
                    _ => out.push(ChangeRecord {
                        path,
                        prev_value: Some(a.clone()),
                        next_value: Some(b.clone()),
                        modified: false,
                    }),
                }
            }
            (Some(a), None) => out.push(ChangeRecord {
                path,
                prev_value: Some(a.clone()),
                next_value: None,
                modified: false,
            }),
            (None, Some(b)) => out.push(ChangeRecord {
                path,
                prev_value: None,
                next_value: Some(b.clone()),
                modified: false,
            }),
            (None, None) => {}
        }
    }
}

fn diff_array(prev: &[Value], next: &[Value], path: &str, out: &mut Vec<ChangeRecord>) {
    if prev.len() != next.len() {
        out.push(ChangeRecord {
            path: format!("{path}.length"),
            prev_value: Some(Value::from(prev.len())),
            next_value: Some(Value::from(next.len())),
            modified: false,
        });
    }

    let shared = prev.len().min(next.len());
    for index in 0..shared {
        if !structural_eq(&prev[index], &next[index]) {
            out.push(ChangeRecord {
                path: format!("{path}[{index}]"),
                prev_value: None,
                next_value: None,
                modified: true,
            });
        }
    }
    for (index, removed) in prev.iter().enumerate().skip(shared) {
        out.push(ChangeRecord {
            path: format!("{path}[{index}]"),
            prev_value: Some(removed.clone()),
            next_value: None,
            modified: false,
        });
    }
    for (index, added) in next.iter().enumerate().skip(shared) {
        out.push(ChangeRecord {
            path: format!("{path}[{index}]"),
            prev_value: None,
            next_value: Some(added.clone()),
            modified: false,
        });
    }
}

/// Full recursive structural equality. Reference equality short-circuits;
/// inputs are assumed acyclic cloned snapshots, so there is no cycle
/// detection.
pub fn structural_eq(a: &Value, b: &Value) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| structural_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| structural_eq(value, other)))
        }
        _ => false,
    }
}

/// Keys of `prev` in order, followed by keys only present in `next`.
pub(crate) fn union_keys<'a>(
    prev: &'a Map<String, Value>,
    next: &'a Map<String, Value>,
) -> Vec<&'a str> {
    let mut keys: Vec<&str> = prev.keys().map(String::as_str).collect();
    for key in next.keys() {
        if !prev.contains_key(key) {
            keys.push(key);
        }
    }
    keys
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(records: &[ChangeRecord]) -> Vec<&str> {
        records.iter().map(|record| record.path.as_str()).collect()
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        let snapshot = json!({"a": 1, "b": {"c": [1, 2, {"d": null}]}});
        assert!(diff(&snapshot, &snapshot).is_empty());
        assert!(diff(&snapshot, &snapshot.clone()).is_empty());
    }

    #[test]
    fn leaf_change_reports_both_values() {
        let records = diff(&json!({"count": 1}), &json!({"count": 2}));
        assert_eq!(
            records,
            vec![ChangeRecord {
                path: "count".to_string(),
                prev_value: Some(json!(1)),
                next_value: Some(json!(2)),
                modified: false,
            }]
        );
    }

    #[test]
    fn nested_objects_diff_with_dotted_paths() {
        let records = diff(
            &json!({"user": {"name": "a", "age": 30}}),
            &json!({"user": {"name": "b", "age": 30}}),
        );
        assert_eq!(paths(&records), vec!["user.name"]);
        assert_eq!(records[0].prev_value, Some(json!("a")));
        assert_eq!(records[0].next_value, Some(json!("b")));
    }

    #[test]
    fn added_and_removed_keys_have_absent_sides() {
        let records = diff(&json!({"a": 1}), &json!({"b": 2}));
        assert_eq!(paths(&records), vec!["a", "b"]);
        assert_eq!(records[0].prev_value, Some(json!(1)));
        assert_eq!(records[0].next_value, None);
        assert_eq!(records[1].prev_value, None);
        assert_eq!(records[1].next_value, Some(json!(2)));
    }

    #[test]
    fn type_mismatch_is_a_leaf_change() {
        let records = diff(&json!({"v": {"a": 1}}), &json!({"v": [1]}));
        assert_eq!(paths(&records), vec!["v"]);
        assert_eq!(records[0].prev_value, Some(json!({"a": 1})));
        assert_eq!(records[0].next_value, Some(json!([1])));
    }

    #[test]
    fn changed_array_element_is_flagged_without_values() {
        let records = diff(&json!({"a": [1, 2, 3]}), &json!({"a": [1, 2, 9]}));
        assert_eq!(
            records,
            vec![ChangeRecord {
                path: "a[2]".to_string(),
                prev_value: None,
                next_value: None,
                modified: true,
            }]
        );
    }

    #[test]
    fn grown_array_reports_length_then_added_element() {
        let records = diff(&json!({"a": [1, 2]}), &json!({"a": [1, 2, 3]}));
        assert_eq!(paths(&records), vec!["a.length", "a[2]"]);
        assert_eq!(records[0].prev_value, Some(json!(2)));
        assert_eq!(records[0].next_value, Some(json!(3)));
        assert_eq!(records[1].prev_value, None);
        assert_eq!(records[1].next_value, Some(json!(3)));
        assert!(!records[1].modified);
    }

    #[test]
    fn shrunk_array_reports_removed_elements() {
        let records = diff(&json!({"a": [1, 2, 3]}), &json!({"a": [1]}));
        assert_eq!(paths(&records), vec!["a.length", "a[1]", "a[2]"]);
        assert_eq!(records[1].prev_value, Some(json!(2)));
        assert_eq!(records[1].next_value, None);
    }

    #[test]
    fn array_elements_are_never_diffed_internally() {
        let records = diff(
            &json!({"a": [{"deep": {"x": 1}}]}),
            &json!({"a": [{"deep": {"x": 2}}]}),
        );
        assert_eq!(
            records,
            vec![ChangeRecord {
                path: "a[0]".to_string(),
                prev_value: None,
                next_value: None,
                modified: true,
            }]
        );
    }

    #[test]
    fn depth_limit_suppresses_deeper_differences() {
        fn nest(depth: usize, leaf: Value) -> Value {
            let mut value = leaf;
            for _ in 0..depth {
                value = json!({"k": value});
            }
            value
        }
        // Difference sits below the depth bound; the diff stays silent
        // rather than recursing without limit.
        let records = diff(&nest(20, json!(1)), &nest(20, json!(2)));
        assert!(records.is_empty());

        // A shallow difference is still reported.
        let records = diff(&nest(3, json!(1)), &nest(3, json!(2)));
        assert_eq!(paths(&records), vec!["k.k.k"]);
    }

    #[test]
    fn non_object_roots_diff_empty() {
        assert!(diff(&json!(1), &json!(2)).is_empty());
        assert!(diff(&json!([1]), &json!([2])).is_empty());
    }

    #[test]
    fn deterministic_for_fixed_inputs() {
        let prev = json!({"b": 1, "a": {"x": [1, 2]}, "c": true});
        let next = json!({"b": 2, "a": {"x": [2, 2]}, "d": false});
        assert_eq!(diff(&prev, &next), diff(&prev, &next));
    }

    #[test]
    fn structural_eq_compares_by_value() {
        let a = json!({"x": [1, {"y": null}], "z": "s"});
        let b = json!({"z": "s", "x": [1, {"y": null}]});
        assert!(structural_eq(&a, &b));
        assert!(!structural_eq(&a, &json!({"x": [1, {"y": 0}], "z": "s"})));
        assert!(!structural_eq(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!structural_eq(&json!([1, 2]), &json!([1])));
        assert!(!structural_eq(&json!(1), &json!("1")));
    }
}
