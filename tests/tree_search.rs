use pbix_doc::tree::{
    find_all_by_value_key, find_comparison_kinds, find_first_by_key, path_has_segment, str_at,
    value_text,
};
use serde_json::json;

#[test]
fn first_match_is_depth_first_left_to_right() {
    let tree = json!({
        "a": {"deep": {"key": "inner"}},
        "key": "outer",
        "b": [{"key": "in-array"}]
    });
    assert_eq!(find_first_by_key(&tree, "key"), Some(&json!("inner")));
}

#[test]
fn sequences_are_searched_in_index_order() {
    let tree = json!([{"x": 1}, {"key": "second"}, {"key": "third"}]);
    assert_eq!(str_at(&tree, "key"), Some("second"));
}

#[test]
fn missing_key_is_none() {
    let tree = json!({"a": [1, 2, {"b": null}]});
    assert_eq!(find_first_by_key(&tree, "zzz"), None);
    assert_eq!(find_first_by_key(&json!("scalar"), "a"), None);
}

#[test]
fn all_marked_leaves_are_found_with_their_paths() {
    let tree = json!({
        "Where": [
            {"Condition": {"Literal": {"Value": "'a'"}}},
            {"Condition": {"Literal": {"Value": "'b'"}}}
        ],
        "other": {"Literal": {"Value": 3}},
        "Value": "root-level is not a hit"
    });
    let hits = find_all_by_value_key(&tree, "Value");
    let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "Where[0].Condition.Literal",
            "Where[1].Condition.Literal",
            "other.Literal",
        ]
    );
    assert_eq!(hits[2].value, &json!(3));
}

#[test]
fn comparison_kinds_in_encounter_order() {
    let tree = json!({
        "And": {
            "Left": {"Comparison": {"ComparisonKind": 2}},
            "Right": {"Comparison": {"ComparisonKind": 4}}
        }
    });
    assert_eq!(find_comparison_kinds(&tree), vec![2, 4]);
}

#[test]
fn segments_match_whole_keys_only() {
    assert!(path_has_segment("filter.Where[0].Condition.Not.Expression", "Not"));
    assert!(path_has_segment("Or[1].Left", "Or"));
    assert!(!path_has_segment("filter.OrderBy[0]", "Or"));
    assert!(!path_has_segment("Nothing.Here", "Not"));
}

#[test]
fn scalar_text_is_unquoted() {
    assert_eq!(value_text(&json!("'x'")), "'x'");
    assert_eq!(value_text(&json!(12)), "12");
    assert_eq!(value_text(&json!(null)), "null");
    assert_eq!(value_text(&json!(true)), "true");
}
