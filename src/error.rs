use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Conditions that abort a whole run, each with its own exit code.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("model exporter not found (looked for {name} under {searched:?})")]
    ExporterNotFound { name: String, searched: Vec<PathBuf> },
    #[error("model export {path} did not appear within {timeout:?}")]
    ExportTimeout { path: PathBuf, timeout: Duration },
    #[error("exporter {program} did not finish within {timeout:?} and was killed")]
    ExporterTimeout { program: PathBuf, timeout: Duration },
    #[error("output file is open in another program, close it before proceeding: {path}")]
    OutputLocked { path: PathBuf },
    #[error("archive has no report layout entry '{entry}'")]
    MissingLayout { entry: String },
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::ExporterNotFound { .. } => 3,
            RunError::ExportTimeout { .. } | RunError::ExporterTimeout { .. } => 4,
            RunError::OutputLocked { .. } => 5,
            RunError::MissingLayout { .. } => 6,
        }
    }
}

/// Exit code for any error that reached the top of the CLI.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RunError>())
        .map(RunError::exit_code)
        .unwrap_or(1)
}
