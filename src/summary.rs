//! Per-page overview: what sits on each page and which filters apply to it.

use crate::report::{Extraction, FieldBinding, FilterRecord, FilterScope};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Ordered the way entries are listed on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ItemType {
    Visual,
    Slicer,
    Filter,
    Button,
    Group,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub item_type: ItemType,
    pub display_type: String,
    pub id: String,
    pub bindings: Vec<FieldBinding>,
    /// `Table[Field] condition` lines.
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub page: String,
    pub entries: Vec<SummaryEntry>,
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z][^A-Z]*").expect("static regex"))
}

/// `lineClusteredColumnComboChart` -> `Line Clustered Column Combo Chart`.
pub fn split_camel_case(s: &str) -> String {
    word_re()
        .find_iter(s)
        .map(|m| {
            let mut chars = m.as_str().chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Item and display type of a visual from its first binding.
pub fn classify_entry(first: &FieldBinding) -> (ItemType, String) {
    match first.visual_type.as_str() {
        "tableEx" => (ItemType::Visual, "Table".into()),
        "pivotTable" => (ItemType::Visual, "Matrix".into()),
        "card" => (ItemType::Visual, "Card".into()),
        "cardVisual" => (ItemType::Visual, "Card (new)".into()),
        "gauge" => (ItemType::Visual, "Gauge".into()),
        "slicer" | "advancedSlicerVisual" => (ItemType::Slicer, first.table.clone()),
        "Bookmark" | "PageNavigation" => (ItemType::Button, first.visual_type.clone()),
        "Group" => (ItemType::Group, "Panel".into()),
        other => (ItemType::Visual, split_camel_case(other)),
    }
}

fn filter_line(f: &FilterRecord) -> String {
    let condition = f.condition();
    if condition.is_empty() {
        f.target()
    } else {
        format!("{} {condition}", f.target())
    }
}

fn push_page(pages: &mut Vec<String>, page: &str) {
    if !pages.iter().any(|p| p == page) {
        pages.push(page.to_string());
    }
}

pub fn summarize(extraction: &Extraction) -> Vec<PageSummary> {
    let filters = extraction.unique_filters();

    let mut pages: Vec<String> = Vec::new();
    for item in &extraction.items {
        push_page(&mut pages, &item.page);
    }
    for f in &filters {
        push_page(&mut pages, &f.page);
    }

    pages
        .into_iter()
        .map(|page| {
            let entries = page_entries(&page, &extraction.items, &filters);
            PageSummary { page, entries }
        })
        .collect()
}

fn page_entries(page: &str, items: &[FieldBinding], filters: &[FilterRecord]) -> Vec<SummaryEntry> {
    let mut visual_ids: Vec<&str> = Vec::new();
    for item in items.iter().filter(|i| i.page == page) {
        if !visual_ids.contains(&item.visual_id.as_str()) {
            visual_ids.push(&item.visual_id);
        }
    }

    let mut entries = Vec::new();
    for id in visual_ids {
        let bindings: Vec<FieldBinding> = items
            .iter()
            .filter(|i| i.page == page && i.visual_id == id)
            .cloned()
            .collect();
        let Some(first) = bindings.first() else {
            continue;
        };
        let (item_type, display_type) = classify_entry(first);
        let lines = filters
            .iter()
            .filter(|f| f.page == page && f.scope == FilterScope::Visual && f.scope_id == id)
            .map(filter_line)
            .collect();
        entries.push(SummaryEntry {
            item_type,
            display_type,
            id: id.to_string(),
            bindings,
            filters: lines,
        });
    }

    for f in filters
        .iter()
        .filter(|f| f.page == page && f.scope == FilterScope::ThisPage)
    {
        entries.push(SummaryEntry {
            item_type: ItemType::Filter,
            display_type: FilterScope::ThisPage.label().to_string(),
            id: f.scope_id.clone(),
            bindings: Vec::new(),
            filters: vec![filter_line(f)],
        });
    }

    entries.sort_by(|a, b| {
        a.item_type
            .cmp(&b.item_type)
            .then_with(|| a.display_type.cmp(&b.display_type))
    });
    entries
}
