//! Field bindings of a single visual container.

use crate::{
    config::Vocabulary,
    diagnostics::RunLog,
    layout::{ReportDocument, VisualContainer},
    report::{FieldBinding, SemanticRole},
    tree::{find_all_by_value_key, find_first_by_key, str_at, value_text},
};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualKind {
    /// Shapes, images and text boxes carry no data.
    Decorative(String),
    Data(String),
    /// Grouping panel without a visual type of its own.
    Group,
    ActionButton,
    Unsupported(String),
}

impl VisualKind {
    pub fn classify(visual_type: Option<&str>, vocab: &Vocabulary) -> Self {
        match visual_type {
            None => VisualKind::Group,
            Some("actionButton") => VisualKind::ActionButton,
            Some(kind) if vocab.decorative_types.iter().any(|d| d == kind) => {
                VisualKind::Decorative(kind.to_string())
            }
            Some(kind) if vocab.visual_types.iter().any(|v| v == kind) => {
                VisualKind::Data(kind.to_string())
            }
            Some(kind) => VisualKind::Unsupported(kind.to_string()),
        }
    }

    pub fn of(config: &Value, vocab: &Vocabulary) -> Self {
        Self::classify(str_at(config, "visualType"), vocab)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Bookmark,
    PageNavigation,
    /// Filter-icon affordance, not a data element.
    Custom,
    Unsupported(String),
}

impl ButtonAction {
    fn parse(raw: &str) -> Self {
        match raw {
            "Bookmark" => ButtonAction::Bookmark,
            "PageNavigation" => ButtonAction::PageNavigation,
            "custom" => ButtonAction::Custom,
            other => ButtonAction::Unsupported(other.to_string()),
        }
    }
}

/// Where a visual sits, for records and log messages.
#[derive(Debug, Clone, Copy)]
pub struct VisualContext<'a> {
    pub page: &'a str,
    pub visual_id: &'a str,
}

/// Table and field of one `Select` entry, before role resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    pub query_ref: String,
    pub table: String,
    pub field: String,
    /// `(level1, level2)` for hierarchy-level references.
    pub hierarchy: Option<(String, String)>,
}

pub fn extract_visual(
    doc: &ReportDocument,
    container: &VisualContainer,
    ctx: VisualContext<'_>,
    vocab: &Vocabulary,
    log: &mut RunLog,
) -> Vec<FieldBinding> {
    let config = &container.config;
    match VisualKind::of(config, vocab) {
        VisualKind::Decorative(_) => Vec::new(),
        VisualKind::Data(kind) => extract_fields(config, &kind, ctx, vocab, log),
        VisualKind::Group => vec![group_record(config, ctx)],
        VisualKind::ActionButton => button_record(doc, container, ctx, log).into_iter().collect(),
        VisualKind::Unsupported(kind) => {
            log.warning(
                format!("New visual type not yet supported: {kind} on page {}", ctx.page),
                config,
            );
            Vec::new()
        }
    }
}

pub fn extract_fields(
    config: &Value,
    visual_type: &str,
    ctx: VisualContext<'_>,
    vocab: &Vocabulary,
    log: &mut RunLog,
) -> Vec<FieldBinding> {
    let roles = role_index(config, vocab);
    let display_names = display_name_pairs(config);

    let Some(select) = find_first_by_key(config, "Select").and_then(Value::as_array) else {
        log.warning(
            format!("Visual {} of type {visual_type} has no Select list", ctx.visual_id),
            config,
        );
        return Vec::new();
    };

    let mut out = Vec::new();
    for entry in select {
        let Some(resolved) = resolve_select(entry, log) else {
            continue;
        };

        let (role, display_name) = match &resolved.hierarchy {
            Some((level1, level2)) => (SemanticRole::Hierarchy, Some(format!("{level1}: {level2}"))),
            None => {
                let role = match roles.get(resolved.query_ref.as_str()) {
                    Some(label) => SemanticRole::Projection(label.to_string()),
                    None => {
                        log.warning(
                            format!(
                                "Unknown data role for {} in visual {}",
                                resolved.query_ref, ctx.visual_id
                            ),
                            entry,
                        );
                        SemanticRole::Unknown
                    }
                };
                let display_name = display_names
                    .iter()
                    .find(|(name, _)| *name == resolved.query_ref)
                    .map(|(_, display)| display.clone())
                    .filter(|display| !display.is_empty() && *display != resolved.field);
                (role, display_name)
            }
        };

        out.push(FieldBinding {
            page: ctx.page.to_string(),
            visual_type: visual_type.to_string(),
            visual_id: ctx.visual_id.to_string(),
            table: resolved.table,
            field: resolved.field,
            display_name,
            role,
        });
    }
    out
}

/// Reverse index from `queryRef` to the output label of its projection role.
fn role_index<'v>(config: &Value, vocab: &'v Vocabulary) -> HashMap<String, &'v str> {
    let mut index = HashMap::new();
    let Some(projections) = find_first_by_key(config, "projections") else {
        return index;
    };
    for role in &vocab.roles {
        let Some(refs) = projections.get(&role.projection).and_then(Value::as_array) else {
            continue;
        };
        for r in refs {
            if let Some(query_ref) = r.get("queryRef").and_then(Value::as_str) {
                index
                    .entry(query_ref.to_string())
                    .or_insert(role.label.as_str());
            }
        }
    }
    index
}

/// `(Name, NativeReferenceName)` pairs found at identical paths.
fn display_name_pairs(config: &Value) -> Vec<(String, String)> {
    let names = find_all_by_value_key(config, "Name");
    let natives = find_all_by_value_key(config, "NativeReferenceName");
    names
        .iter()
        .filter_map(|name| {
            natives
                .iter()
                .find(|native| native.path == name.path)
                .map(|native| (value_text(name.value), value_text(native.value)))
        })
        .collect()
}

/// Resolves one `Select` entry by its shape; `None` when it cannot be used.
pub fn resolve_select(entry: &Value, log: &mut RunLog) -> Option<SelectField> {
    let has = |key: &str| entry.get(key).is_some_and(|v| !v.is_null());

    if has("HierarchyLevel") {
        // Variation sources nest their own `Name`; only the entry's counts.
        let name = entry.get("Name").and_then(Value::as_str).unwrap_or_default();
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() < 3 {
            log.warning("Hierarchy reference is too short", entry);
            return None;
        }
        return Some(SelectField {
            query_ref: name.to_string(),
            table: parts[0].to_string(),
            field: parts[2].to_string(),
            hierarchy: Some((parts[1].to_string(), parts[2].to_string())),
        });
    }

    if has("Measure") || has("Column") {
        let name = entry.get("Name").and_then(Value::as_str).unwrap_or_default();
        let Some((table, field)) = name.split_once('.') else {
            log.warning("Field reference has no table qualifier", entry);
            return None;
        };
        let table = table.strip_prefix("Sum(").unwrap_or(table);
        let field = match str_at(entry, "Property") {
            Some(property) if property != field => property,
            _ => field,
        };
        return Some(SelectField {
            query_ref: name.to_string(),
            table: table.to_string(),
            field: field.to_string(),
            hierarchy: None,
        });
    }

    if has("Aggregation") {
        let name = entry.get("Name").and_then(Value::as_str).unwrap_or_default();
        let Some((table, field)) = innermost_parens(name).and_then(|inner| inner.split_once('.'))
        else {
            log.warning("Aggregation reference has no table.field span", entry);
            return None;
        };
        return Some(SelectField {
            query_ref: name.to_string(),
            table: table.to_string(),
            field: field.to_string(),
            hierarchy: None,
        });
    }

    log.info("Unspecified select entry type", entry);
    None
}

/// Contents of the innermost `(...)` span.
fn innermost_parens(s: &str) -> Option<&str> {
    let close = s.find(')')?;
    let open = s[..close].rfind('(')?;
    Some(&s[open + 1..close])
}

fn group_record(config: &Value, ctx: VisualContext<'_>) -> FieldBinding {
    FieldBinding {
        page: ctx.page.to_string(),
        visual_type: "Group".to_string(),
        visual_id: ctx.visual_id.to_string(),
        table: String::new(),
        field: str_at(config, "displayName").unwrap_or_default().to_string(),
        display_name: None,
        role: SemanticRole::Group,
    }
}

fn literal_of(tree: &Value, key: &str) -> Option<String> {
    find_first_by_key(tree, key)
        .and_then(|node| find_first_by_key(node, "Value"))
        .map(|v| value_text(v).replace('\'', ""))
}

fn button_record(
    doc: &ReportDocument,
    container: &VisualContainer,
    ctx: VisualContext<'_>,
    log: &mut RunLog,
) -> Option<FieldBinding> {
    let config = &container.config;
    let raw = literal_of(config, "type")
        .or_else(|| find_first_by_key(config, "Value").map(|v| value_text(v).replace('\'', "")));
    let Some(raw) = raw else {
        log.warning(format!("Button without action type on page {}", ctx.page), config);
        return None;
    };

    let action = ButtonAction::parse(&raw);
    let (field, display_name, role) = match &action {
        ButtonAction::Bookmark => {
            let Some(bookmark) = literal_of(config, "bookmark") else {
                log.warning("Bookmark button without bookmark reference", config);
                return None;
            };
            (bookmark, None, SemanticRole::Bookmark)
        }
        ButtonAction::PageNavigation => {
            let Some(target) = literal_of(config, "navigationSection") else {
                log.warning("Page navigation button without target section", config);
                return None;
            };
            let field = match doc.section_display_name(&target) {
                Some(name) => name.to_string(),
                None => {
                    log.warning(format!("Page navigation target {target} not found"), config);
                    target
                }
            };
            (field, Some("Page Navigation".to_string()), SemanticRole::Page)
        }
        ButtonAction::Custom => {
            log.debug("Skipping custom filter icon button", config);
            return None;
        }
        ButtonAction::Unsupported(kind) => {
            log.warning(format!("Unknown button type {kind} on {}", ctx.page), config);
            return None;
        }
    };

    Some(FieldBinding {
        page: ctx.page.to_string(),
        visual_type: raw,
        visual_id: ctx.visual_id.to_string(),
        table: String::new(),
        field,
        display_name,
        role,
    })
}
