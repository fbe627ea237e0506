use super::{ExporterDiag, ModelExporter};
use crate::config::Config;
use crate::error::RunError;
use crate::util::ensure_dir;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Drives the Tabular Editor command line with a generated export script.
pub struct TabularEditor {
    cfg: Config,
    executable: PathBuf,
}

impl TabularEditor {
    pub fn new(cfg: &Config) -> Result<Self> {
        let executable = match locate_executable(cfg) {
            Some(p) => p,
            None => {
                return Err(RunError::ExporterNotFound {
                    name: cfg.export.executable_name.clone(),
                    searched: candidate_paths(cfg),
                }
                .into());
            }
        };
        debug!("exporter executable {}", executable.display());
        Ok(Self {
            cfg: cfg.clone(),
            executable,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn write_script(&self, out_dir: &Path, export_path: &Path) -> Result<PathBuf> {
        let script = out_dir.join(&self.cfg.export.script_filename);
        if script.exists() && !self.cfg.export.regenerate_script {
            return Ok(script);
        }
        std::fs::write(&script, export_script(export_path))
            .with_context(|| format!("writing export script: {}", script.display()))?;
        Ok(script)
    }
}

/// Explicit executable first, then `<search_dir>/<install_subdir>/<executable_name>`.
pub fn candidate_paths(cfg: &Config) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if !cfg.export.executable.trim().is_empty() {
        out.push(PathBuf::from(cfg.export.executable.trim()));
    }
    for dir in &cfg.export.search_dirs {
        out.push(
            Path::new(dir)
                .join(&cfg.export.install_subdir)
                .join(&cfg.export.executable_name),
        );
    }
    out
}

pub fn locate_executable(cfg: &Config) -> Option<PathBuf> {
    candidate_paths(cfg).into_iter().find(|p| p.is_file())
}

/// Script that dumps every named model object's properties as TSV.
pub fn export_script(export_path: &Path) -> String {
    let target = export_path.display().to_string().replace('\\', "/");
    format!(
        r#"// Auto formatting
Model.AllMeasures.FormatDax();

var objects = new List<TabularNamedObject>();
objects.AddRange(Model.Tables);
objects.AddRange(Model.AllColumns);
objects.AddRange(Model.AllHierarchies);
objects.AddRange(Model.AllLevels);
objects.AddRange(Model.AllMeasures);
objects.AddRange(Model.Relationships);
objects.AddRange(Model.AllPartitions);

var tsv = ExportProperties(objects);
SaveFile("{target}", tsv);
"#
    )
}

impl ModelExporter for TabularEditor {
    fn doctor(&self) -> Result<ExporterDiag> {
        Ok(ExporterDiag {
            name: self.cfg.export.executable_name.clone(),
            executable: Some(self.executable.clone()),
            searched: candidate_paths(&self.cfg),
        })
    }

    fn export(&self, model: &Path, out_dir: &Path) -> Result<PathBuf> {
        ensure_dir(out_dir)?;
        let export_path = out_dir.join(&self.cfg.export.export_filename);
        let script = self.write_script(out_dir, &export_path)?;

        if export_path.exists() {
            std::fs::remove_file(&export_path)
                .with_context(|| format!("removing stale export: {}", export_path.display()))?;
        }

        info!("exporting model {}", model.display());
        let mut child = Command::new(&self.executable)
            .arg(model)
            .arg("-S")
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning exporter: {}", self.executable.display()))?;

        let output = wait_with_timeout(
            &mut child,
            &self.executable,
            Duration::from_secs(self.cfg.export.process_timeout_seconds),
        )?;
        if !output.status.success() {
            warn!(
                "exporter exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        wait_for_file(
            &export_path,
            Duration::from_secs(self.cfg.export.timeout_seconds),
            Duration::from_millis(self.cfg.export.poll_interval_ms),
        )?;
        Ok(export_path)
    }
}

/// Polls until `path` exists or `timeout` elapses.
pub fn wait_for_file(path: &Path, timeout: Duration, poll: Duration) -> Result<()> {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() > timeout {
            return Err(RunError::ExportTimeout {
                path: path.to_path_buf(),
                timeout,
            }
            .into());
        }
        std::thread::sleep(poll);
    }
    Ok(())
}

fn wait_with_timeout(child: &mut Child, program: &Path, timeout: Duration) -> Result<Output> {
    // Drain both pipes on helper threads; a chatty exporter must not block on a full pipe.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("exporter timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            // Grandchildren may still hold the pipes open; the readers are left detached.
            drop(stdout_thread);
            drop(stderr_thread);
            return Err(RunError::ExporterTimeout {
                program: program.to_path_buf(),
                timeout,
            }
            .into());
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
