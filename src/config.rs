use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub vocabulary: Vocabulary,
    #[serde(default)]
    pub definitions: Definitions,
    #[serde(default)]
    pub rendering: Rendering,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
    /// Pages with these display names are not walked.
    pub skip_pages: Vec<String>,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            skip_pages: vec!["Template".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            work_dir: ".pbix-doc-work".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Export {
    /// Explicit exporter executable; when empty the search dirs are probed.
    pub executable: String,
    pub search_dirs: Vec<String>,
    pub install_subdir: String,
    pub executable_name: String,
    pub script_filename: String,
    pub export_filename: String,
    /// Always regenerate the export even when one already exists.
    pub refresh: bool,
    pub regenerate_script: bool,
    pub process_timeout_seconds: u64,
    pub timeout_seconds: u64,
    pub poll_interval_ms: u64,
}
impl Default for Export {
    fn default() -> Self {
        Self {
            executable: "".into(),
            search_dirs: vec![
                "C:\\Program Files".into(),
                "C:\\Program Files (x86)".into(),
            ],
            install_subdir: "Tabular Editor".into(),
            executable_name: "TabularEditor.exe".into(),
            script_filename: "TabularScript.cs".into(),
            export_filename: "documentation.tsv".into(),
            refresh: false,
            regenerate_script: false,
            process_timeout_seconds: 300,
            timeout_seconds: 5,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleLabel {
    pub projection: String,
    pub label: String,
}

impl RoleLabel {
    fn new(projection: &str, label: &str) -> Self {
        Self {
            projection: projection.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub decorative_types: Vec<String>,
    pub visual_types: Vec<String>,
    /// Projection role name to output label, first match wins.
    pub roles: Vec<RoleLabel>,
    pub known_functions: Vec<String>,
}
impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            decorative_types: ["shape", "image", "textbox"]
                .into_iter()
                .map(String::from)
                .collect(),
            visual_types: DEFAULT_VISUAL_TYPES.iter().map(|s| s.to_string()).collect(),
            roles: DEFAULT_ROLES
                .iter()
                .map(|(p, l)| RoleLabel::new(p, l))
                .collect(),
            known_functions: DEFAULT_FUNCTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const DEFAULT_VISUAL_TYPES: &[&str] = &[
    "lineClusteredColumnComboChart",
    "clusteredColumnChart",
    "clusteredBarChart",
    "donutChart",
    "azureMap",
    "barChart",
    "scatterChart",
    "columnChart",
    "hundredPercentStackedBarChart",
    "hundredPercentStackedColumnChart",
    "lineChart",
    "areaChart",
    "stackedAreaChart",
    "lineStackedColumnComboChart",
    "ribbonChart",
    "waterfallChart",
    "funnel",
    "pieChart",
    "treemap",
    "map",
    "filledMap",
    "multiRowCard",
    "kpi",
    "pivotTable",
    "keyDriversVisual",
    "decompositionTreeVisual",
    "card",
    "cardVisual",
    "gauge",
    "tableEx",
    "slicer",
    "advancedSlicerVisual",
];

const DEFAULT_ROLES: &[(&str, &str)] = &[
    ("Tooltips", "Tooltips"),
    ("Category", "Categoricals"),
    ("X", "X-Values"),
    ("Y", "Y-Values"),
    ("Y2", "Y2-Values"),
    ("Size", "Size Indicator"),
    ("Series", "Series"),
    ("Rows", "Rows"),
    ("Columns", "Cols"),
    ("Play", "Play"),
    ("Breakdown", "Breakdown"),
    ("Group", "Group"),
    ("Values", "Values"),
    ("Details", "Details"),
    ("Indicator", "Indicators"),
    ("TrendLine", "Trendlines"),
    ("Goal", "Goals"),
    ("Target", "Targets"),
    ("ExplainBy", "Explained By"),
    ("Analyze", "Analyzed"),
    ("Data", "Data"),
    ("MaxValue", "Max Values"),
    ("MinValue", "Min Values"),
    ("TargetValue", "Target Values"),
];

const DEFAULT_FUNCTIONS: &[&str] = &[
    "IF",
    "DIVIDE",
    "MOD",
    "FORMAT",
    "CALCULATE",
    "CALCULATETABLE",
    "VALUES",
    "ISBLANK",
    "YEAR",
    "MONTH",
    "DAY",
    "WEEKDAY",
    "WEEKNUM",
    "DATEDIFF",
    "DATEADD",
    "DATESBETWEEN",
    "DATESINPERIOD",
    "SWITCH",
    "DATE",
    "LASTDATE",
    "FIRSTDATE",
    "TODAY",
    "EOMONTH",
    "ISFILTERED",
    "FALSE",
    "TRUE",
    "SUM",
    "SUMX",
    "AVERAGE",
    "AVERAGEX",
    "DISTINCTCOUNT",
    "COUNT",
    "COUNTX",
    "CONCATENATE",
    "CONCATENATEX",
    "SAMEPERIODLASTYEAR",
    "ALL",
    "ALLSELECTED",
    "COUNTROWS",
    "MIN",
    "MINX",
    "MAX",
    "MAXX",
    "IN",
    "LEFT",
    "RIGHT",
    "DISTINCT",
    "SELECTEDVALUE",
    "BLANK",
    "ISINSCOPE",
    "FILTER",
    "USERELATIONSHIP",
    "REMOVEFILTERS",
    "ABS",
    "HASONEVALUE",
    "RELATED",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    pub description_tag: String,
    pub measure_table: String,
    pub paren_palette_len: usize,
}
impl Default for Definitions {
    fn default() -> Self {
        Self {
            description_tag: "////".into(),
            measure_table: "_Measures".into(),
            paren_palette_len: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rendering {
    pub function: String,
    pub measure: String,
    pub return_kw: String,
    pub var_name: String,
    pub comment: String,
    pub quote: String,
    pub var_kw: String,
    pub parens: Vec<String>,
}
impl Default for Rendering {
    fn default() -> Self {
        Self {
            function: "#3165bb".into(),
            measure: "#001080".into(),
            return_kw: "#1800ff".into(),
            var_name: "#098658".into(),
            comment: "#08800f".into(),
            quote: "#a31515".into(),
            var_kw: "#000fff".into(),
            parens: vec!["#0433fa".into(), "#319331".into(), "#7b3831".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_documentation: bool,
    /// `{name}` is replaced by the report stem.
    pub documentation_filename: String,
    pub write_index_json: bool,
    pub write_anomaly_log: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_documentation: true,
            documentation_filename: "{name}_Documentation.json".into(),
            write_index_json: true,
            write_anomaly_log: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: false,
        }
    }
}
