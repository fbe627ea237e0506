use crate::{
    config::Config,
    dax,
    export::{
        tabular_editor::{candidate_paths, TabularEditor},
        ExporterDiag, ModelExporter,
    },
    layout::ReportDocument,
    pipeline::{ModelSource, Pipeline},
    sink::{ensure_writable, DocumentationSink, JsonFileSink},
    util::{ensure_dir, hash_file, now_rfc3339},
    walker,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "pbix-doc")]
#[command(about = "Documents Power BI reports: field usage, filters, model definitions")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./pbix-doc.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report where the model exporter was looked for and found.
    Doctor {},
    /// Print field bindings and filters of a report archive.
    Extract {
        #[arg(long)]
        input: PathBuf,
    },
    /// Classify the tokens of a formula read from a text file.
    Tokenize {
        #[arg(long)]
        input: PathBuf,
    },
    /// Run the model exporter only.
    Export {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    Run {
        #[arg(long)]
        input: PathBuf,
        /// Model file to export with the external exporter.
        #[arg(long, conflicts_with = "model_export")]
        model: Option<PathBuf>,
        /// Existing tab-separated model export.
        #[arg(long)]
        model_export: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg, &cfg_path)
        }
        Command::Extract { input } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            extract(&cfg, input)
        }
        Command::Tokenize { input } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            tokenize(&cfg, input)
        }
        Command::Export { model, out_dir } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            export(&cfg, model, out_dir.as_deref())
        }
        Command::Run {
            input,
            model,
            model_export,
            out_dir,
        } => {
            let source = match (model, model_export) {
                (_, Some(tsv)) => ModelSource::Export(tsv.clone()),
                (Some(m), None) => ModelSource::Model(m.clone()),
                (None, None) => ModelSource::None,
            };
            run(&args, &cfg, input, source, out_dir.as_deref())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("pbix-doc.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("pbix-doc.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config, cfg_path: &Path) -> Result<()> {
    let diag = match TabularEditor::new(cfg) {
        Ok(exporter) => exporter.doctor()?,
        Err(err) => {
            warn!("{err:#}");
            ExporterDiag {
                name: cfg.export.executable_name.clone(),
                executable: None,
                searched: candidate_paths(cfg),
            }
        }
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "config": cfg_path,
            "exporter": diag,
        }))?
    );
    Ok(())
}

fn extract(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(input)?;
    let doc = ReportDocument::open(input)?;
    let extraction = walker::extract(&doc, cfg);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "items": extraction.items,
            "filters": extraction.unique_filters(),
            "anomalies": extraction.log.entries().len(),
        }))?
    );
    Ok(())
}

fn tokenize(cfg: &Config, input: &Path) -> Result<()> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("reading definition: {}", input.display()))?;
    let classified = dax::classify(
        &source,
        &cfg.vocabulary.known_functions,
        cfg.definitions.paren_palette_len,
    );
    println!("{}", serde_json::to_string_pretty(&classified)?);
    Ok(())
}

fn export(cfg: &Config, model: &Path, out_override: Option<&Path>) -> Result<()> {
    let out_dir = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.work_dir));
    let exporter = TabularEditor::new(cfg)?;
    let tsv = exporter.export(model, &out_dir)?;
    println!("{}", tsv.display());
    Ok(())
}

fn run(
    args: &Args,
    cfg: &Config,
    input: &Path,
    source: ModelSource,
    out_override: Option<&Path>,
) -> Result<()> {
    validate_input(input)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("input has no file name: {}", input.display()))?;
    let input_hash = hash_file(input).with_context(|| format!("hashing input: {}", input.display()))?;

    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let job_dir = out_root.join(&stem);

    ensure_dir(&job_dir)?;
    ensure_dir(&job_dir.join("logs"))?;

    let log_path = resolve_log_path(cfg, Some(&job_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!("report={stem} out={}", job_dir.display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(job_dir.join("effective-config.toml"), raw)?;
    }

    let doc_path = job_dir.join(cfg.output.documentation_filename.replace("{name}", &stem));
    if cfg.output.write_documentation {
        ensure_writable(&doc_path)?;
    }

    let exporter = match &source {
        ModelSource::Model(_) => {
            let reusable = !cfg.export.refresh && job_dir.join(&cfg.export.export_filename).exists();
            match TabularEditor::new(cfg) {
                Ok(e) => Some(e),
                Err(err) if reusable => {
                    warn!("{err:#}; reusing the previous export");
                    None
                }
                Err(err) => return Err(err),
            }
        }
        _ => None,
    };
    let pipeline = Pipeline::new(cfg, exporter);

    let started = now_rfc3339();
    let result = pipeline.run_job(input, &source, &job_dir)?;

    if cfg.output.write_documentation {
        let mut sink = JsonFileSink::new(&doc_path);
        sink.write(&result.documentation)?;
        sink.finish()?;
    }

    let anomalies = result.extraction.log.entries().len();
    if cfg.output.write_anomaly_log && anomalies > 0 {
        std::fs::write(
            job_dir.join("logs").join("anomalies.txt"),
            &result.documentation.log,
        )?;
    }

    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "report": stem,
            "input_sha256": input_hash,
            "started": started,
            "finished": now_rfc3339(),
            "documentation": doc_path.file_name().map(|n| n.to_string_lossy().into_owned()),
            "model_export": result.generated_export,
            "anomalies": anomalies,
        });
        std::fs::write(job_dir.join("index.json"), serde_json::to_string_pretty(&index)?)?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "report": stem,
                "job_dir": job_dir,
                "items": result.documentation.items.len(),
                "filters": result.documentation.filters.len(),
                "anomalies": anomalies,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn validate_input(input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    match input.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pbix") || ext.eq_ignore_ascii_case("pbit") => {}
        Some(_) => return Err(anyhow!("input is not a report archive: {}", input.display())),
        None => warn!("input has no extension; assuming report archive: {}", input.display()),
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(job_dir) = job_dir {
        return Some(job_dir.join("logs").join("pbix-doc.log"));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("pbix-doc.log"))
}
