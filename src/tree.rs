//! Recursive lookups over loosely-typed JSON trees.
//!
//! Mapping entries are visited in document order (serde_json is built with
//! `preserve_order`), sequences in index order. Absence is a normal outcome.

use serde::Serialize;
use serde_json::Value;

/// A value found under a keyword, with the path of the mapping holding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit<'a> {
    pub path: String,
    pub value: &'a Value,
}

/// First value stored under `key`, depth-first, left to right.
pub fn find_first_by_key<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    match tree {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    return Some(v);
                }
                if v.is_object() || v.is_array() {
                    if let Some(found) = find_first_by_key(v, key) {
                        return Some(found);
                    }
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| find_first_by_key(item, key)),
        _ => None,
    }
}

/// Every non-root mapping that contains `value_key`, paired with its path.
pub fn find_all_by_value_key<'a>(tree: &'a Value, value_key: &str) -> Vec<Hit<'a>> {
    let mut hits = Vec::new();
    collect_value_hits(tree, value_key, "", &mut hits);
    hits
}

fn collect_value_hits<'a>(node: &'a Value, value_key: &str, path: &str, hits: &mut Vec<Hit<'a>>) {
    let visit = |child: &'a Value, child_path: String, hits: &mut Vec<Hit<'a>>| {
        if let Value::Object(map) = child {
            if let Some(v) = map.get(value_key) {
                hits.push(Hit {
                    path: child_path.clone(),
                    value: v,
                });
            }
        }
        if child.is_object() || child.is_array() {
            collect_value_hits(child, value_key, &child_path, hits);
        }
    };

    match node {
        Value::Object(map) => {
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                visit(v, child_path, hits);
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                visit(item, format!("{path}[{idx}]"), hits);
            }
        }
        _ => {}
    }
}

/// Every integer stored under a `ComparisonKind` key, in encounter order.
pub fn find_comparison_kinds(tree: &Value) -> Vec<i64> {
    let mut kinds = Vec::new();
    collect_comparison_kinds(tree, &mut kinds);
    kinds
}

fn collect_comparison_kinds(node: &Value, kinds: &mut Vec<i64>) {
    match node {
        Value::Object(map) => {
            if let Some(kind) = map.get("ComparisonKind").and_then(Value::as_i64) {
                kinds.push(kind);
            }
            for v in map.values() {
                collect_comparison_kinds(v, kinds);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_comparison_kinds(item, kinds);
            }
        }
        _ => {}
    }
}

/// Whether a hit path contains `segment` as a whole key (`a.Not.b`, `Not[0]`).
pub fn path_has_segment(path: &str, segment: &str) -> bool {
    path.split(['.', '['])
        .any(|part| part == segment)
}

/// Text of a scalar leaf; strings are returned without JSON quoting.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

pub fn str_at<'a>(tree: &'a Value, key: &str) -> Option<&'a str> {
    find_first_by_key(tree, key).and_then(Value::as_str)
}
