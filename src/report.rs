use crate::diagnostics::RunLog;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticRole {
    /// Output label of a projection role (Values, Categoricals, ...).
    Projection(String),
    Hierarchy,
    Group,
    Bookmark,
    Page,
    Unknown,
}

impl SemanticRole {
    pub fn as_str(&self) -> &str {
        match self {
            SemanticRole::Projection(label) => label,
            SemanticRole::Hierarchy => "Hierarchy",
            SemanticRole::Group => "Group",
            SemanticRole::Bookmark => "Bookmark",
            SemanticRole::Page => "Page",
            SemanticRole::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SemanticRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldBinding {
    pub page: String,
    pub visual_type: String,
    pub visual_id: String,
    pub table: String,
    pub field: String,
    pub display_name: Option<String>,
    pub role: SemanticRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterScope {
    Visual,
    ThisPage,
}

impl FilterScope {
    pub fn label(self) -> &'static str {
        match self {
            FilterScope::Visual => "Visual",
            FilterScope::ThisPage => "This Page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterRecord {
    pub page: String,
    pub scope_id: String,
    pub scope: FilterScope,
    pub table: String,
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl FilterRecord {
    pub fn target(&self) -> String {
        format!("{}[{}]", self.table, self.field)
    }

    /// `operator value`, or whichever of the two is present.
    pub fn condition(&self) -> String {
        match (self.operator.is_empty(), self.value.is_empty()) {
            (false, false) => format!("{} {}", self.operator, self.value),
            (false, true) => self.operator.clone(),
            (true, _) => self.value.clone(),
        }
    }
}

/// Everything one pass over a report layout produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub items: Vec<FieldBinding>,
    pub filters: Vec<FilterRecord>,
    pub log: RunLog,
}

impl Extraction {
    /// Filters with exact duplicates removed, first occurrence kept.
    pub fn unique_filters(&self) -> Vec<FilterRecord> {
        let mut seen = std::collections::HashSet::new();
        self.filters
            .iter()
            .filter(|f| seen.insert((*f).clone()))
            .cloned()
            .collect()
    }
}
