use crate::{
    config::Config,
    diagnostics::Severity,
    export::ModelExporter,
    layout::ReportDocument,
    model::{ModelCatalog, ModelExport},
    report::Extraction,
    sink::Documentation,
    summary, usage, walker,
    util::now_rfc3339,
};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the model side of the documentation comes from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Report only; definitions, tables and usage stay empty.
    None,
    /// An existing tab-separated export.
    Export(PathBuf),
    /// A model file handed to the exporter.
    Model(PathBuf),
}

pub struct Pipeline<E: ModelExporter> {
    cfg: Config,
    exporter: Option<E>,
}

pub struct JobOutput {
    pub documentation: Documentation,
    pub extraction: Extraction,
    /// TSV produced by the exporter during this run.
    pub generated_export: Option<PathBuf>,
}

impl<E: ModelExporter> Pipeline<E> {
    pub fn new(cfg: &Config, exporter: Option<E>) -> Self {
        Self {
            cfg: cfg.clone(),
            exporter,
        }
    }

    pub fn run_job(&self, input: &Path, source: &ModelSource, job_dir: &Path) -> Result<JobOutput> {
        let started = Instant::now();

        let doc = ReportDocument::open(input)?;
        debug!("layout sections={}", doc.sections.len());

        let extraction = walker::extract(&doc, &self.cfg);
        let severe = extraction.log.count_at_least(Severity::Error);
        if severe > 0 {
            warn!("{severe} anomalies at error level, see the anomaly log");
        }

        let (catalog, generated_export) = self.load_catalog(source, job_dir)?;
        let documentation = self.document(input, &extraction, catalog);

        info!(
            "documented items={} definitions={} unused={} in {:?}",
            documentation.items.len(),
            documentation.definitions.len(),
            documentation.unused.len(),
            started.elapsed()
        );

        Ok(JobOutput {
            documentation,
            extraction,
            generated_export,
        })
    }

    fn load_catalog(
        &self,
        source: &ModelSource,
        job_dir: &Path,
    ) -> Result<(Option<ModelCatalog>, Option<PathBuf>)> {
        let (tsv, generated) = match source {
            ModelSource::None => return Ok((None, None)),
            ModelSource::Export(path) => (path.clone(), None),
            ModelSource::Model(model) => {
                let existing = job_dir.join(&self.cfg.export.export_filename);
                if existing.exists() && !self.cfg.export.refresh {
                    info!("reusing model export {}", existing.display());
                    (existing, None)
                } else {
                    let exporter = self
                        .exporter
                        .as_ref()
                        .ok_or_else(|| anyhow!("no model exporter configured"))?;
                    let path = exporter
                        .export(model, job_dir)
                        .with_context(|| format!("exporting model: {}", model.display()))?;
                    (path.clone(), Some(path))
                }
            }
        };

        let export = ModelExport::load(&tsv)?;
        Ok((Some(ModelCatalog::build(&export, &self.cfg)), generated))
    }

    fn document(
        &self,
        input: &Path,
        extraction: &Extraction,
        catalog: Option<ModelCatalog>,
    ) -> Documentation {
        let report = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut doc = Documentation {
            report,
            generated_at: now_rfc3339(),
            items: extraction.items.clone(),
            filters: extraction.unique_filters(),
            definitions: Vec::new(),
            tables: Vec::new(),
            hierarchies: Vec::new(),
            relationships: Vec::new(),
            unused: Vec::new(),
            pages: summary::summarize(extraction),
            styles: self.cfg.rendering.clone(),
            log: extraction.log.render(),
        };

        if let Some(mut catalog) = catalog {
            usage::attach_pages(&mut catalog, extraction);
            doc.unused = usage::unused_fields(&catalog, extraction);
            doc = doc.with_catalog(catalog);
        }
        doc
    }
}
