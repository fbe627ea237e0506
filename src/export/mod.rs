pub mod tabular_editor;

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ExporterDiag {
    pub name: String,
    pub executable: Option<PathBuf>,
    pub searched: Vec<PathBuf>,
}

/// Produces the tab-separated model export for a semantic model file.
pub trait ModelExporter {
    fn doctor(&self) -> Result<ExporterDiag>;
    /// Runs the export into `out_dir` and returns the path of the TSV.
    fn export(&self, model: &Path, out_dir: &Path) -> Result<PathBuf>;
}
