use crate::{
    config::Config,
    diagnostics::RunLog,
    filter::{format_page_filter, format_visual_filter, UNKNOWN},
    layout::{is_empty_tree, is_undecoded, ReportDocument, Section, VisualContainer},
    report::{Extraction, FieldBinding, FilterRecord, FilterScope},
    tree::{find_first_by_key, str_at},
    visual::{extract_visual, VisualContext},
};
use serde_json::Value;
use tracing::{debug, info};

/// Per-run accumulators for one extraction; nothing here outlives the call.
pub struct Session<'c> {
    cfg: &'c Config,
    items: Vec<FieldBinding>,
    filters: Vec<FilterRecord>,
    log: RunLog,
}

impl<'c> Session<'c> {
    pub fn new(cfg: &'c Config) -> Self {
        Self {
            cfg,
            items: Vec::new(),
            filters: Vec::new(),
            log: RunLog::new(),
        }
    }

    pub fn walk(mut self, doc: &ReportDocument) -> Extraction {
        for section in &doc.sections {
            if self.cfg.global.skip_pages.iter().any(|p| *p == section.display_name) {
                debug!("skipping page {}", section.display_name);
                continue;
            }
            self.walk_section(doc, section);
        }

        info!(
            "extracted items={} filters={} anomalies={}",
            self.items.len(),
            self.filters.len(),
            self.log.entries().len()
        );

        Extraction {
            items: self.items,
            filters: self.filters,
            log: self.log,
        }
    }

    fn walk_section(&mut self, doc: &ReportDocument, section: &Section) {
        let page = section.display_name.as_str();
        debug!(
            "page {} containers={}",
            page,
            section.visual_containers.len()
        );

        for container in &section.visual_containers {
            let ctx = VisualContext {
                page,
                visual_id: container.id(),
            };
            if is_undecoded(&container.config) {
                self.log.warning(
                    format!("Visual config on page {page} is not valid JSON"),
                    &container.config,
                );
            } else if container.has_config() {
                let bindings =
                    extract_visual(doc, container, ctx, &self.cfg.vocabulary, &mut self.log);
                self.items.extend(bindings);
            }
            self.walk_visual_filters(container, ctx);
        }

        self.walk_page_filters(section);
    }

    fn walk_visual_filters(&mut self, container: &VisualContainer, ctx: VisualContext<'_>) {
        if is_undecoded(&container.filters) {
            self.log.warning(
                format!("Visual filters on page {} are not valid JSON", ctx.page),
                &container.filters,
            );
            return;
        }
        let Some(rows) = container.filters.as_array() else {
            return;
        };
        let scope_id = ctx.visual_id;

        for row in rows {
            if row.get("filter").is_none_or(is_empty_tree) {
                continue;
            }
            let (table, field) = filter_target(row, &mut self.log);
            let condition = format_visual_filter(row, &mut self.log);
            self.filters.push(FilterRecord {
                page: ctx.page.to_string(),
                scope_id: scope_id.to_string(),
                scope: FilterScope::Visual,
                table,
                field,
                operator: condition.operator,
                value: condition.value,
            });
        }
    }

    fn walk_page_filters(&mut self, section: &Section) {
        let page = section.display_name.as_str();
        if is_undecoded(&section.filters) {
            self.log.warning(
                format!("Page filters of {page} are not valid JSON"),
                &section.filters,
            );
            return;
        }
        let Some(rows) = section.filters.as_array() else {
            return;
        };

        for row in rows {
            let table = str_at(row, "Entity").unwrap_or(UNKNOWN).to_string();
            let field = str_at(row, "Property").unwrap_or(UNKNOWN).to_string();
            let scope_id = row
                .get("displayName")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(field.as_str())
                .to_string();

            for condition in format_page_filter(row, page, &mut self.log) {
                self.filters.push(FilterRecord {
                    page: page.to_string(),
                    scope_id: scope_id.clone(),
                    scope: FilterScope::ThisPage,
                    table: table.clone(),
                    field: field.clone(),
                    operator: condition.operator,
                    value: condition.value,
                });
            }
        }
    }
}

/// Table and field a visual filter applies to.
fn filter_target(row: &Value, log: &mut RunLog) -> (String, String) {
    let table = match str_at(row, "Entity") {
        Some(t) => t.to_string(),
        None => {
            log.warning("Filter without source table", row);
            UNKNOWN.to_string()
        }
    };

    if let Some(property) = str_at(row, "Property") {
        return (table, property.to_string());
    }

    match find_first_by_key(row, "HierarchyLevel") {
        Some(level) => {
            log.warning("Filter on hierarchy level", row);
            let name = level
                .get("Level")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN);
            (table, name.to_string())
        }
        None => {
            log.warning("Filter without target field", row);
            (table, UNKNOWN.to_string())
        }
    }
}

/// Walks every page of the document with a fresh session.
pub fn extract(doc: &ReportDocument, cfg: &Config) -> Extraction {
    Session::new(cfg).walk(doc)
}
