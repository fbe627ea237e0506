//! Tabular-model export: the tab-separated table produced by the external
//! exporter, keyed by dotted object paths.

use crate::config::Config;
use crate::dax::{self, ClassifiedDefinition};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

const REQUIRED_COLUMNS: [&str; 5] = ["Object", "Name", "DataType", "Description", "Expression"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub object: String,
    pub name: String,
    pub data_type: String,
    pub description: String,
    pub expression: String,
}

#[derive(Debug, Clone, Default)]
pub struct ModelExport {
    pub rows: Vec<ExportRow>,
}

impl ModelExport {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading model export: {}", path.display()))?;
        Self::from_tsv_str(&raw).with_context(|| format!("parsing model export: {}", path.display()))
    }

    pub fn from_tsv_str(raw: &str) -> Result<Self> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut lines = raw.lines();
        let header: Vec<&str> = lines
            .next()
            .ok_or_else(|| anyhow!("model export is empty"))?
            .split('\t')
            .map(str::trim)
            .collect();

        let mut idx = [0usize; 5];
        for (slot, column) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = header
                .iter()
                .position(|h| *h == column)
                .ok_or_else(|| anyhow!("model export has no '{column}' column"))?;
        }

        let mut rows = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split('\t').collect();
            let cell = |i: usize| cells.get(idx[i]).copied().unwrap_or_default().to_string();
            rows.push(ExportRow {
                object: cell(0),
                name: cell(1),
                data_type: cell(2),
                description: cell(3),
                expression: cell(4),
            });
        }
        debug!("model export rows={}", rows.len());
        Ok(Self { rows })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectKind {
    Table,
    Column,
    Hierarchy,
    Measure,
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    pub kind: ObjectKind,
    pub table: String,
    pub member: String,
}

fn guid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(Relationship\.)?[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        )
        .expect("static regex")
    })
}

/// Byte offset just past the `n`th (1-based) `.` in `s`.
fn after_nth_dot(s: &str, n: usize) -> Option<usize> {
    s.match_indices('.').nth(n - 1).map(|(i, _)| i + 1)
}

impl ObjectPath {
    pub fn parse(object: &str) -> Self {
        let tail = after_nth_dot(object, 2).map(|i| &object[i..]).unwrap_or_default();
        let table = tail.split('.').next().unwrap_or_default().to_string();

        if guid_re().is_match(tail) || guid_re().is_match(&table) {
            return Self {
                kind: ObjectKind::Relationship,
                table,
                member: String::new(),
            };
        }

        let kind = if object.contains(".C.") {
            ObjectKind::Column
        } else if object.contains(".H.") {
            ObjectKind::Hierarchy
        } else if object.contains(".M.") {
            ObjectKind::Measure
        } else {
            return Self {
                kind: ObjectKind::Table,
                table,
                member: String::new(),
            };
        };

        let member = after_nth_dot(object, 4).map(|i| &object[i..]).unwrap_or_default();
        let member = member.strip_prefix('[').unwrap_or(member);
        let member = member.strip_suffix(']').unwrap_or(member);
        Self {
            kind,
            table,
            member: member.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub child: String,
    pub direction: String,
    pub parent: String,
}

fn relationship_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?\])\s*(\S*>)\s*(.*)$").expect("static regex"))
}

impl Relationship {
    /// Parses `'Sales'[CustomerKey] --> 'Customer'[CustomerKey]`.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = relationship_re().captures(name.trim())?;
        let side = |i: usize| {
            let raw = caps.get(i).map(|m| m.as_str()).unwrap_or_default().replace('\'', "");
            raw.split('[').next().unwrap_or_default().trim().to_string()
        };
        let direction = match caps.get(2).map(|m| m.as_str()) {
            Some("-->") => "One Way",
            Some("<-->") => "Two Way",
            _ => "Unknown Type",
        };
        Some(Self {
            child: side(1),
            direction: direction.to_string(),
            parent: side(3),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Definition {
    pub kind: ObjectKind,
    pub name: String,
    pub data_type: String,
    pub description: String,
    pub definition: String,
    pub table: String,
    pub dependants: Vec<String>,
    pub comment: String,
    pub pages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<ClassifiedDefinition>,
}

/// Structural view of the model: what the documentation needs from the export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelCatalog {
    pub tables: Vec<String>,
    pub hierarchies: Vec<(String, String)>,
    pub relationships: Vec<Relationship>,
    /// Every column and measure, in export order.
    pub fields: Vec<(String, String)>,
    pub definitions: Vec<Definition>,
}

impl ModelCatalog {
    pub fn build(export: &ModelExport, cfg: &Config) -> Self {
        let mut catalog = ModelCatalog::default();
        let parsed: Vec<ObjectPath> = export.rows.iter().map(|r| ObjectPath::parse(&r.object)).collect();

        for (row, path) in export.rows.iter().zip(&parsed) {
            match path.kind {
                ObjectKind::Relationship => {
                    if let Some(rel) = Relationship::parse(&row.name) {
                        catalog.relationships.push(rel);
                    }
                }
                ObjectKind::Table => {
                    if !path.table.is_empty() && !catalog.tables.contains(&path.table) {
                        catalog.tables.push(path.table.clone());
                    }
                }
                _ => {}
            }
        }
        catalog.relationships.sort_by(|a, b| (&a.child, &a.parent).cmp(&(&b.child, &b.parent)));

        let unquote = table_unquote_re(&catalog.tables);
        for (row, path) in export.rows.iter().zip(&parsed) {
            match path.kind {
                ObjectKind::Hierarchy => {
                    catalog.hierarchies.push((path.table.clone(), path.member.clone()));
                }
                ObjectKind::Column | ObjectKind::Measure => {
                    catalog.fields.push((path.table.clone(), path.member.clone()));
                    let expression = normalize_expression(&row.expression, unquote.as_ref());
                    if path.kind == ObjectKind::Column && expression.trim().is_empty() {
                        continue;
                    }
                    catalog
                        .definitions
                        .push(build_definition(row, path, &expression, cfg));
                }
                _ => {}
            }
        }

        catalog
    }
}

fn table_unquote_re(tables: &[String]) -> Option<Regex> {
    if tables.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = tables.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!(r"'\s*({})\s*'", alternatives.join("|"))).ok()
}

/// Undoes the exporter's escaping and drops quotes around known table names.
pub fn normalize_expression(raw: &str, unquote: Option<&Regex>) -> String {
    let text = raw.replace("\\t", "\t").replace("\\n", "\n").replace("    ", "\t");
    match unquote {
        Some(re) => re.replace_all(&text, "$1").into_owned(),
        None => text,
    }
}

/// Splits a tagged description off the front of a definition.
pub fn split_description(definition: &str, tag: &str) -> (String, String) {
    if tag.is_empty() {
        return (String::new(), definition.trim().to_string());
    }
    let Some(start) = definition.find(tag) else {
        return (String::new(), definition.trim().to_string());
    };
    let after = &definition[start + tag.len()..];
    match after.find(tag) {
        Some(end) => (
            after[..end].trim().to_string(),
            after[end + tag.len()..].trim().to_string(),
        ),
        None => {
            let (line, rest) = after.split_once('\n').unwrap_or((after, ""));
            (line.trim().to_string(), rest.trim().to_string())
        }
    }
}

fn build_definition(row: &ExportRow, path: &ObjectPath, expression: &str, cfg: &Config) -> Definition {
    let (tagged, body) = split_description(expression, &cfg.definitions.description_tag);
    let description = if row.description.trim().is_empty() {
        tagged
    } else {
        row.description.replace("\\n", "\n")
    };

    let tokens = (!body.is_empty()).then(|| {
        dax::classify(
            &body,
            &cfg.vocabulary.known_functions,
            cfg.definitions.paren_palette_len,
        )
    });
    let mut dependants = Vec::new();
    if let Some(t) = &tokens {
        for (table, column) in &t.references {
            dependants.push(format!("{table}[{column}]"));
        }
        for measure in &t.measures {
            let qualified = format!("{}{measure}", cfg.definitions.measure_table);
            let bare = &measure[1..measure.len() - 1];
            let already = t.references.iter().any(|(_, column)| column == bare);
            if !already && !dependants.contains(&qualified) {
                dependants.push(qualified);
            }
        }
    }

    Definition {
        kind: path.kind,
        name: if row.name.is_empty() {
            path.member.clone()
        } else {
            row.name.clone()
        },
        data_type: row.data_type.clone(),
        description,
        definition: body,
        table: path.table.clone(),
        dependants,
        comment: String::new(),
        pages: Vec::new(),
        tokens,
    }
}
