use crate::config::Rendering;
use crate::error::RunError;
use crate::model::{Definition, ModelCatalog, Relationship};
use crate::report::{FieldBinding, FilterRecord};
use crate::summary::PageSummary;
use crate::usage::UnusedField;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a run documents about one report.
#[derive(Debug, Clone, Serialize)]
pub struct Documentation {
    pub report: String,
    pub generated_at: String,
    pub items: Vec<FieldBinding>,
    pub filters: Vec<FilterRecord>,
    pub definitions: Vec<Definition>,
    pub tables: Vec<String>,
    pub hierarchies: Vec<(String, String)>,
    pub relationships: Vec<Relationship>,
    pub unused: Vec<UnusedField>,
    pub pages: Vec<PageSummary>,
    pub styles: Rendering,
    pub log: String,
}

impl Documentation {
    /// Moves the model-derived parts of `catalog` into the document.
    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.definitions = catalog.definitions;
        self.tables = catalog.tables;
        self.hierarchies = catalog.hierarchies;
        self.relationships = catalog.relationships;
        self
    }
}

/// Consumer of finished documentation.
pub trait DocumentationSink {
    fn write(&mut self, doc: &Documentation) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one pretty-printed JSON document.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentationSink for JsonFileSink {
    fn write(&mut self, doc: &Documentation) -> Result<()> {
        ensure_writable(&self.path)?;
        let file = std::fs::File::create(&self.path)
            .map_err(|e| locked_or(e, &self.path))
            .with_context(|| format!("create documentation: {}", self.path.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, doc)?;
        w.flush()?;
        info!("documentation written: {}", self.path.display());
        Ok(())
    }
}

/// Keeps documents in memory.
#[derive(Default)]
pub struct MemorySink {
    docs: Vec<Documentation>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_docs(self) -> Vec<Documentation> {
        self.docs
    }
}

impl DocumentationSink for MemorySink {
    fn write(&mut self, doc: &Documentation) -> Result<()> {
        self.docs.push(doc.clone());
        Ok(())
    }
}

/// Fails with [`RunError::OutputLocked`] when an existing output file
/// cannot be opened for writing.
pub fn ensure_writable(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| locked_or(e, path))
}

fn locked_or(err: std::io::Error, path: &Path) -> anyhow::Error {
    if err.kind() == ErrorKind::PermissionDenied {
        RunError::OutputLocked {
            path: path.to_path_buf(),
        }
        .into()
    } else {
        anyhow::Error::new(err).context(format!("open {}", path.display()))
    }
}
