//! Typed view over the `Report/Layout` document of a report archive.
//!
//! Several fields of the layout are JSON documents encoded as strings; they
//! are decoded once while deserializing so the rest of the crate only ever
//! sees `serde_json::Value` trees.

use crate::error::RunError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

pub const LAYOUT_ENTRY: &str = "Report/Layout";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    #[serde(default, deserialize_with = "nested_json")]
    pub config: Value,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub visual_containers: Vec<VisualContainer>,
    #[serde(default, deserialize_with = "nested_json")]
    pub filters: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualContainer {
    #[serde(default, deserialize_with = "nested_json")]
    pub config: Value,
    #[serde(default, deserialize_with = "nested_json")]
    pub filters: Value,
    #[serde(default, deserialize_with = "nested_json")]
    pub query: Value,
    #[serde(default, deserialize_with = "nested_json")]
    pub data_transforms: Value,
}

impl VisualContainer {
    /// Opaque id of the visual (`config.name`), empty when absent.
    pub fn id(&self) -> &str {
        self.config
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn has_config(&self) -> bool {
        !is_empty_tree(&self.config)
    }
}

impl ReportDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("open report archive: {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("reading report archive: {}", path.display()))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).with_context(|| "not a zip archive")?;
        let mut bytes = Vec::new();
        {
            let mut entry = archive
                .by_name(LAYOUT_ENTRY)
                .map_err(|_| RunError::MissingLayout {
                    entry: LAYOUT_ENTRY.to_string(),
                })?;
            entry
                .read_to_end(&mut bytes)
                .with_context(|| format!("read {LAYOUT_ENTRY}"))?;
        }
        debug!("layout entry {} bytes", bytes.len());
        let text = decode_utf16le(&bytes)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).with_context(|| "parsing report layout JSON")
    }

    pub fn section_display_name(&self, section_id: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section_id)
            .map(|s| s.display_name.as_str())
    }
}

pub fn decode_utf16le(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(anyhow!("layout is not UTF-16LE: odd byte length {}", bytes.len()));
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    let text: String = char::decode_utf16(units)
        .collect::<std::result::Result<_, _>>()
        .with_context(|| "layout contains invalid UTF-16")?;
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

pub fn is_empty_tree(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// True when a nested field was not valid JSON and still holds its raw text.
pub fn is_undecoded(value: &Value) -> bool {
    value.is_string()
}

/// Decodes a JSON-in-a-string field. Malformed text is kept as a raw string
/// so one broken container cannot fail the whole document.
fn nested_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    match raw {
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            // A bare string literal is not a tree; keeping it would look undecoded.
            Ok(Value::String(_)) => Ok(Value::Null),
            Ok(decoded) => Ok(decoded),
            Err(err) => {
                debug!("nested JSON field did not decode: {err}");
                Ok(Value::String(s))
            }
        },
        other => Ok(other),
    }
}
