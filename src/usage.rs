//! Which model fields the report never touches.

use crate::model::ModelCatalog;
use crate::report::Extraction;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedField {
    pub table: String,
    pub field: String,
}

/// Model columns and measures, in export order, that no item, filter or
/// definition refers to.
pub fn unused_fields(catalog: &ModelCatalog, extraction: &Extraction) -> Vec<UnusedField> {
    let mut used: HashSet<(&str, &str)> = HashSet::new();
    for item in &extraction.items {
        used.insert((item.table.as_str(), item.field.as_str()));
    }
    for filter in &extraction.filters {
        used.insert((filter.table.as_str(), filter.field.as_str()));
    }

    let mut used_members: HashSet<&str> = HashSet::new();
    for def in &catalog.definitions {
        let Some(tokens) = &def.tokens else {
            continue;
        };
        for (table, column) in &tokens.references {
            used.insert((table.as_str(), column.as_str()));
        }
        for measure in &tokens.measures {
            used_members.insert(&measure[1..measure.len() - 1]);
        }
    }

    catalog
        .fields
        .iter()
        .filter(|(table, field)| {
            !used.contains(&(table.as_str(), field.as_str())) && !used_members.contains(field.as_str())
        })
        .map(|(table, field)| UnusedField {
            table: table.clone(),
            field: field.clone(),
        })
        .collect()
}

/// Fills each definition's `pages` with the pages binding it, first-seen order.
pub fn attach_pages(catalog: &mut ModelCatalog, extraction: &Extraction) {
    for def in &mut catalog.definitions {
        let mut pages: Vec<String> = Vec::new();
        for item in &extraction.items {
            if item.table == def.table && item.field == def.name && !pages.contains(&item.page) {
                pages.push(item.page.clone());
            }
        }
        def.pages = pages;
    }
}
