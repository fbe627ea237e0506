use pbix_doc::diagnostics::{RunLog, Severity};
use pbix_doc::filter::{clean_literal, comparison_phrase, format_page_filter, format_visual_filter};
use serde_json::{json, Value};

fn column(entity: &str, property: &str) -> Value {
    json!({"Column": {"Expression": {"SourceRef": {"Entity": entity}}, "Property": property}})
}

#[test]
fn literal_cleanup() {
    assert_eq!(clean_literal("5"), "5");
    assert_eq!(clean_literal("5L"), "5");
    assert_eq!(clean_literal("'abc'"), "abc");
    assert_eq!(clean_literal("true"), "True");
    assert_eq!(clean_literal("false"), "False");
    assert_eq!(clean_literal("datetime'2024-01-31T00:00:00'"), "2024-01-31T00:00:00");
}

#[test]
fn literal_cleanup_is_idempotent() {
    for raw in ["5", "5L", "'abc'", "true", "-12L", "3.5D"] {
        let once = clean_literal(raw);
        assert_eq!(clean_literal(&once), once, "input {raw}");
    }
}

#[test]
fn relative_date_this_month() {
    let row = json!({
        "expression": column("Calendar", "Date"),
        "filter": {"Where": [{"Condition": {"Comparison": {
            "Right": {"DateSpan": {"Expression": {"Now": {}}, "TimeUnit": 2}}
        }}}]},
        "type": "RelativeDate"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&row, &mut log);
    assert_eq!(c.operator, "is in this month");
    assert_eq!(c.value, "");
}

#[test]
fn relative_date_last_three_weeks() {
    let row = json!({
        "expression": column("Calendar", "Date"),
        "filter": {"Where": [{"Condition": {"Between": {
            "LowerBound": {"DateSpan": {
                "Expression": {"DateAdd": {
                    "Expression": {"DateSpan": {"Expression": {"Now": {}}, "TimeUnit": 0}},
                    "Amount": -3,
                    "TimeUnit": 1
                }},
                "TimeUnit": 0
            }},
            "UpperBound": {"DateSpan": {"Expression": {"Now": {}}, "TimeUnit": 0}}
        }}}]},
        "type": "RelativeDate"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&row, &mut log);
    assert_eq!(c.operator, "is in the last 3 week");
    assert_eq!(c.value, "");
    assert!(log.is_empty());
}

#[test]
fn relative_date_with_odd_unit_count_logs_error() {
    let row = json!({
        "filter": {"a": {"TimeUnit": 0}, "b": {"TimeUnit": 0}, "c": {"Amount": 2}},
        "type": "RelativeDate"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&row, &mut log);
    assert_eq!(c.operator, "is in the next 2 days including today");
    assert_eq!(log.count_at_least(Severity::Error), 1);
}

#[test]
fn negated_null_comparison_is_not_blank() {
    let row = json!({
        "expression": column("Sales", "Channel"),
        "filter": {
            "Version": 2,
            "From": [{"Name": "s", "Entity": "Sales", "Type": 0}],
            "Where": [{"Condition": {"Not": {"Expression": {"Comparison": {
                "ComparisonKind": 0,
                "Left": {"Column": {"Expression": {"SourceRef": {"Source": "s"}}, "Property": "Channel"}},
                "Right": {"Literal": {"Value": "null"}}
            }}}}}]
        },
        "type": "Advanced"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&row, &mut log);
    assert_eq!(c.operator, "is not blank");
    assert_eq!(c.value, "");
}

#[test]
fn and_comparison_joins_clauses() {
    let row = json!({
        "filter": {"Where": [{"Condition": {"And": {
            "Left": {"Comparison": {"ComparisonKind": 2, "Right": {"Literal": {"Value": "10L"}}}},
            "Right": {"Comparison": {"ComparisonKind": 3, "Right": {"Literal": {"Value": "20L"}}}}
        }}}]},
        "type": "Advanced"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&row, &mut log);
    assert_eq!(c.operator, "is greater than or equal to");
    assert_eq!(c.value, "10 and is less than 20");
}

#[test]
fn membership_operators_follow_value_count() {
    let single = json!({
        "filter": {"Where": [{"Condition": {"In": {"Values": [[{"Literal": {"Value": "'East'"}}]]}}}]},
        "type": "Categorical"
    });
    let many = json!({
        "filter": {"Where": [{"Condition": {"In": {"Values": [
            [{"Literal": {"Value": "'East'"}}],
            [{"Literal": {"Value": "'West'"}}]
        ]}}}]},
        "type": "Categorical"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&single, &mut log);
    assert_eq!((c.operator.as_str(), c.value.as_str()), ("=", "East"));
    let c = format_visual_filter(&many, &mut log);
    assert_eq!((c.operator.as_str(), c.value.as_str()), ("in", "East, West"));
}

#[test]
fn inverted_membership() {
    let row = json!({
        "filter": {"Where": [{"Condition": {"Not": {"Expression": {"In": {"Values": [
            [{"Literal": {"Value": "1L"}}],
            [{"Literal": {"Value": "2L"}}]
        ]}}}}}]},
        "objects": {"general": [{"properties": {"isInvertedSelectionMode": {"expr": {"Literal": {"Value": "true"}}}}}]},
        "type": "Categorical"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&row, &mut log);
    assert_eq!(c.operator, "not in");
    assert_eq!(c.value, "1, 2");
}

#[test]
fn top_n_filter() {
    let row = json!({
        "filter": {
            "From": [
                {"Name": "subquery", "Expression": {"Subquery": {"Query": {
                    "From": [{"Name": "c", "Entity": "Customer", "Type": 0}],
                    "OrderBy": [{"Direction": 2, "Expression": {"Measure": {
                        "Expression": {"SourceRef": {"Source": "c"}}, "Property": "Revenue"
                    }}}],
                    "Top": 5
                }}}, "Type": 2},
                {"Name": "c", "Entity": "Customer", "Type": 0}
            ]
        },
        "type": "TopN"
    });
    let mut log = RunLog::new();
    let c = format_visual_filter(&row, &mut log);
    assert_eq!(c.operator, "by Top 5");
    assert_eq!(c.value, "Customer[Revenue]");
}

#[test]
fn unknown_comparison_kind_is_reported_in_phrase() {
    assert_eq!(comparison_phrase(9, false, false), "not implemented (9)");
    assert_eq!(comparison_phrase(0, false, true), "is blank");
    assert_eq!(comparison_phrase(0, true, false), "is not");
}

#[test]
fn categorical_page_filter() {
    let row = json!({
        "name": "Filter1",
        "expression": column("Sales", "Region"),
        "filter": {"Where": [{"Condition": {"In": {"Values": [
            [{"Literal": {"Value": "'North'"}}],
            [{"Literal": {"Value": "'South'"}}]
        ]}}}]},
        "type": "Categorical"
    });
    let mut log = RunLog::new();
    let out = format_page_filter(&row, "Overview", &mut log);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].operator, "in");
    assert_eq!(out[0].value, "North, South");
}

#[test]
fn empty_categorical_page_filter_is_unused() {
    let row = json!({"expression": column("Sales", "Region"), "type": "Categorical"});
    let mut log = RunLog::new();
    assert!(format_page_filter(&row, "Overview", &mut log).is_empty());
    assert_eq!(log.entries().len(), 1);
    assert_eq!(log.entries()[0].severity, Severity::Info);
}

#[test]
fn advanced_page_filter_yields_one_condition_per_clause() {
    let row = json!({
        "expression": column("Sales", "Amount"),
        "filter": {"Where": [
            {"Condition": {"Comparison": {"ComparisonKind": 1, "Right": {"Literal": {"Value": "100L"}}}}},
            {"Condition": {"Not": {"Expression": {"Comparison": {"ComparisonKind": 0, "Right": {"Literal": {"Value": "null"}}}}}}}
        ]},
        "type": "Advanced"
    });
    let mut log = RunLog::new();
    let out = format_page_filter(&row, "Overview", &mut log);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].operator, "is greater than");
    assert_eq!(out[0].value, "100");
    assert_eq!(out[1].operator, "is not blank");
    assert_eq!(out[1].value, "");
}

#[test]
fn relative_date_page_filter() {
    let row = json!({
        "expression": column("Calendar", "Date"),
        "filter": {"Where": [{"Condition": {"Between": {
            "LowerBound": {"DateSpan": {"Expression": {"DateAdd": {"Amount": -2, "TimeUnit": 3}}}},
            "UpperBound": {"DateSpan": {"Expression": {"Now": {}}}}
        }}}]},
        "type": "RelativeDate"
    });
    let mut log = RunLog::new();
    let out = format_page_filter(&row, "Overview", &mut log);
    assert_eq!(out[0].operator, "in the last");
    assert_eq!(out[0].value, "2 years including today");
}

#[test]
fn unknown_page_filter_variant_warns() {
    let row = json!({"expression": column("Sales", "Region"), "type": "Tuple"});
    let mut log = RunLog::new();
    assert!(format_page_filter(&row, "Overview", &mut log).is_empty());
    assert_eq!(log.entries()[0].severity, Severity::Warning);
}
