use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, warn};

const WRAP_WIDTH: usize = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn code(self) -> i8 {
        match self {
            Severity::Debug => -1,
            Severity::Info => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
            Severity::Critical => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub severity: Severity,
    pub message: String,
    pub data: Value,
}

/// Recovered anomalies of one extraction run, in the order they occurred.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunLog {
    entries: Vec<Anomaly>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, severity: Severity, message: impl Into<String>, data: &Value) {
        let message = message.into();
        match severity {
            Severity::Debug => debug!("{message}"),
            Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error | Severity::Critical => error!("{message}"),
        }
        self.entries.push(Anomaly {
            severity,
            message,
            data: data.clone(),
        });
    }

    pub fn debug(&mut self, message: impl Into<String>, data: &Value) {
        self.record(Severity::Debug, message, data);
    }

    pub fn info(&mut self, message: impl Into<String>, data: &Value) {
        self.record(Severity::Info, message, data);
    }

    pub fn warning(&mut self, message: impl Into<String>, data: &Value) {
        self.record(Severity::Warning, message, data);
    }

    pub fn error(&mut self, message: impl Into<String>, data: &Value) {
        self.record(Severity::Error, message, data);
    }

    pub fn entries(&self) -> &[Anomaly] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity >= severity).count()
    }

    /// Accumulated text: one block per anomaly, offending data wrapped.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("{}: {}.\n", entry.severity, entry.message));
            out.push_str(&wrap(&data_text(&entry.data)));
            out.push_str("\n\n");
        }
        out
    }
}

fn data_text(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn wrap(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(WRAP_WIDTH) {
            lines.push(chunk.iter().collect());
        }
    }
    lines.join("\n")
}
