//! Canonical `(operator, value)` strings for report filters.

use crate::{
    diagnostics::RunLog,
    tree::{find_all_by_value_key, find_comparison_kinds, find_first_by_key, path_has_segment,
        value_text, Hit},
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub operator: String,
    pub value: String,
}

impl Condition {
    fn new(operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Discriminator of a page-scoped filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFilterKind {
    Categorical,
    Advanced,
    RelativeDate,
    Unsupported(String),
}

impl PageFilterKind {
    pub fn of(filter: &Value) -> Self {
        match find_first_by_key(filter, "type").and_then(Value::as_str) {
            Some("Categorical") => PageFilterKind::Categorical,
            Some("Advanced") => PageFilterKind::Advanced,
            Some("RelativeDate") => PageFilterKind::RelativeDate,
            Some(other) => PageFilterKind::Unsupported(other.to_string()),
            None => PageFilterKind::Unsupported(String::new()),
        }
    }
}

/// Literal cleanup: integer coercion, booleans, datetime payloads, quotes.
pub fn clean_literal(raw: &str) -> String {
    match raw {
        "true" => return "True".to_string(),
        "false" => return "False".to_string(),
        _ => {}
    }

    if raw.contains("datetime") {
        if let Some(inner) = quoted_re().captures(raw).and_then(|c| c.get(1)) {
            return inner.as_str().to_string();
        }
    }

    let digits = raw.strip_suffix('L').unwrap_or(raw);
    match digits.parse::<i64>() {
        Ok(n) => n.to_string(),
        Err(_) => raw.replace('\'', ""),
    }
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'(.*?)'").expect("static regex"))
}

/// Formats one visual-level filter entry.
pub fn format_visual_filter(filter: &Value, log: &mut RunLog) -> Condition {
    let filter_type = filter.get("type").and_then(Value::as_str).unwrap_or_default();

    if filter_type == "RelativeDate" {
        return relative_date(filter, log);
    }
    if filter_type == "TopN" {
        return top_n(filter, log);
    }

    let values = find_all_by_value_key(filter, "Value");
    let kinds = find_comparison_kinds(filter);
    if !kinds.is_empty() {
        return comparison(&kinds, &values, filter, log);
    }

    let (joined, count, inverted) = membership_values(&values, log);
    Condition::new(membership_operator(count, inverted), joined)
}

fn relative_date(filter: &Value, log: &mut RunLog) -> Condition {
    let units = find_all_by_value_key(filter, "TimeUnit");

    if units.len() == 1 {
        let phrase = match units[0].value.as_i64() {
            Some(0) => "is today",
            Some(1) => "is in this week",
            Some(2) => "is in this month",
            Some(3) => "is in this year",
            _ => {
                log.warning("Unknown relative date time unit", filter);
                "is"
            }
        };
        return Condition::new(phrase, "");
    }

    let include_today = match units.len() {
        4 => false,
        6 => true,
        n => {
            log.error(
                format!("Unexpected TimeUnit count {n} in relative date filter, assuming including today"),
                filter,
            );
            true
        }
    };

    let unit_at = |idx: usize| units.get(idx).and_then(|h| h.value.as_i64());
    let mut span = String::new();
    if unit_at(2).is_some_and(|v| v != 0) {
        span.push_str("calendar ");
    }
    span.push_str(match unit_at(1) {
        Some(0) => "days",
        Some(1) => "week",
        Some(2) => "month",
        Some(3) => "year",
        _ => {
            log.warning("Unknown relative date unit kind", filter);
            "unknown unit"
        }
    });

    let amount = find_all_by_value_key(filter, "Amount")
        .first()
        .and_then(|h| h.value.as_i64());
    let Some(amount) = amount else {
        log.error("Relative date filter has no amount", filter);
        return Condition::new(UNKNOWN, "");
    };

    let direction = if amount > 0 { "next" } else { "last" };
    let mut phrase = format!("is in the {direction} {} {span}", amount.abs());
    if include_today {
        phrase.push_str(" including today");
    }
    Condition::new(phrase, "")
}

fn top_n(filter: &Value, log: &mut RunLog) -> Condition {
    let table = find_all_by_value_key(filter, "Entity")
        .into_iter()
        .filter(|h| h.path.contains("From[0]"))
        .last()
        .map(|h| value_text(h.value));
    let count = find_first_by_key(filter, "Top").map(value_text);
    let order_by = find_first_by_key(filter, "OrderBy");
    let property = order_by
        .and_then(|o| find_first_by_key(o, "Property"))
        .and_then(Value::as_str);

    let (Some(table), Some(count), Some(property)) = (table, count, property) else {
        log.warning("Incomplete TopN filter", filter);
        return Condition::new(UNKNOWN, "");
    };

    let direction = order_by
        .and_then(|o| o.get(0))
        .and_then(|first| first.get("Direction"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let order = if direction == 2 { "Top" } else { "Bottom" };

    Condition::new(format!("by {order} {count}"), format!("{table}[{property}]"))
}

struct Clause {
    phrase: String,
    operand: String,
}

fn comparison(kinds: &[i64], values: &[Hit<'_>], filter: &Value, log: &mut RunLog) -> Condition {
    let connective = values
        .first()
        .map(|h| {
            if path_has_segment(&h.path, "And") {
                "and"
            } else if path_has_segment(&h.path, "Or") {
                "or"
            } else {
                ""
            }
        })
        .unwrap_or_default();

    let mut clauses = Vec::with_capacity(kinds.len());
    for (idx, &kind) in kinds.iter().enumerate() {
        let Some(hit) = values.get(idx) else {
            log.warning(format!("Comparison {idx} has no literal operand"), filter);
            clauses.push(Clause {
                phrase: comparison_phrase(kind, false, false),
                operand: String::new(),
            });
            continue;
        };
        let is_null = value_text(hit.value) == "null";
        let negated = path_has_segment(&hit.path, "Not");
        let operand = if kind == 0 && is_null {
            String::new()
        } else if hit.path.contains("Where") {
            clean_literal(&value_text(hit.value))
        } else {
            log.debug("Comparison operand outside of Where clause", filter);
            String::new()
        };
        clauses.push(Clause {
            phrase: comparison_phrase(kind, negated, is_null),
            operand,
        });
    }

    let Some((first, rest)) = clauses.split_first() else {
        return Condition::new(UNKNOWN, "");
    };
    let mut tail = vec![first.operand.clone()];
    for clause in rest {
        tail.push(connective.to_string());
        tail.push(clause.phrase.clone());
        tail.push(clause.operand.clone());
    }
    Condition::new(first.phrase.clone(), collapse_whitespace(&tail.join(" ")))
}

/// Operator phrase of a ComparisonKind code.
pub fn comparison_phrase(kind: i64, negated: bool, is_null: bool) -> String {
    match kind {
        0 => match (negated, is_null) {
            (true, true) => "is not blank",
            (true, false) => "is not",
            (false, true) => "is blank",
            (false, false) => "is",
        }
        .to_string(),
        1 => "is greater than".to_string(),
        2 => "is greater than or equal to".to_string(),
        3 => "is less than".to_string(),
        4 => "is less than or equal to".to_string(),
        other => format!("not implemented ({other})"),
    }
}

fn membership_values(values: &[Hit<'_>], log: &mut RunLog) -> (String, usize, bool) {
    let mut collected = Vec::new();
    let mut inverted = false;
    for hit in values {
        if hit.path.contains("Where") {
            collected.push(clean_literal(&value_text(hit.value)));
        } else if hit.path.contains("isInverted") {
            inverted = clean_literal(&value_text(hit.value)) == "True";
        } else {
            log.debug(format!("Literal outside of filter clause at {}", hit.path), hit.value);
        }
    }
    (collected.join(", "), collected.len(), inverted)
}

fn membership_operator(count: usize, inverted: bool) -> &'static str {
    match (count > 1, inverted) {
        (false, false) => "=",
        (false, true) => "<>",
        (true, false) => "in",
        (true, true) => "not in",
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Formats one page-level filter; may yield several conditions (Advanced).
pub fn format_page_filter(filter: &Value, page: &str, log: &mut RunLog) -> Vec<Condition> {
    match PageFilterKind::of(filter) {
        PageFilterKind::Categorical => categorical(filter, page, log).into_iter().collect(),
        PageFilterKind::Advanced => advanced(filter, log),
        PageFilterKind::RelativeDate => page_relative_date(filter, log).into_iter().collect(),
        PageFilterKind::Unsupported(kind) => {
            log.warning(format!("Unknown filter variant '{kind}' on page {page}"), filter);
            Vec::new()
        }
    }
}

fn categorical(filter: &Value, page: &str, log: &mut RunLog) -> Option<Condition> {
    let rows = find_first_by_key(filter, "Values")
        .and_then(Value::as_array)
        .filter(|rows| !rows.is_empty());
    let Some(rows) = rows else {
        log.info(format!("Unused filter on page {page}"), filter);
        return None;
    };

    let inverted = find_first_by_key(filter, "isInvertedSelectionMode")
        .and_then(|node| node.pointer("/expr/Literal/Value"))
        .map(|v| value_text(v) == "true")
        .unwrap_or(false);

    let values: Vec<String> = rows
        .iter()
        .filter_map(|row| find_first_by_key(row, "Value"))
        .map(|v| value_text(v).replace('\'', ""))
        .collect();

    Some(Condition::new(
        membership_operator(rows.len(), inverted),
        values.join(", "),
    ))
}

fn advanced(filter: &Value, log: &mut RunLog) -> Vec<Condition> {
    let Some(clauses) = find_first_by_key(filter, "Where").and_then(Value::as_array) else {
        log.warning("Advanced filter without Where clause", filter);
        return Vec::new();
    };

    let mut out = Vec::new();
    for clause in clauses {
        let Some(literal) = find_first_by_key(clause, "Right")
            .and_then(|right| right.pointer("/Literal/Value"))
        else {
            log.warning("Advanced filter clause without literal operand", clause);
            continue;
        };
        let negated = find_first_by_key(clause, "Not").is_some();
        let kind = find_comparison_kinds(clause).first().copied().unwrap_or(0);
        let raw = value_text(literal);
        let is_null = raw == "null";
        let value = if kind == 0 && is_null {
            String::new()
        } else {
            clean_literal(&raw)
        };
        out.push(Condition::new(comparison_phrase(kind, negated, is_null), value));
    }
    out
}

fn page_relative_date(filter: &Value, log: &mut RunLog) -> Option<Condition> {
    let Some(lower) = find_first_by_key(filter, "LowerBound") else {
        log.error("Relative date filter has no lower bound, skipping", filter);
        return None;
    };
    let Some(date_add) = lower.pointer("/DateSpan/Expression/DateAdd") else {
        log.error("Relative date lower bound has no DateAdd expression", filter);
        return None;
    };

    let amount = date_add.get("Amount").and_then(Value::as_i64).unwrap_or(0);
    let unit = match date_add.get("TimeUnit").and_then(Value::as_i64) {
        Some(0) => "days",
        Some(1) => "weeks",
        Some(2) => "months",
        Some(3) => "years",
        _ => {
            log.error("Unknown relative date unit", filter);
            "unknown unit"
        }
    };

    let mut value = format!("{} {unit}", amount.abs());
    if find_first_by_key(filter, "UpperBound").is_some() {
        value.push_str(" including today");
    }
    Some(Condition::new("in the last", value))
}
