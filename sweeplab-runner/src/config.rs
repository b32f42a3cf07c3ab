//! Serializable sweep configuration.
//!
//! Three TOML documents feed a sweep:
//! - the sweep file itself (`SweepConfig`): indicator, symbols, evaluation
//!   and orchestration settings, every field defaulted
//! - a grid file: `[<indicator>.<variant>]` tables of parameter axes
//! - a course-selection file: `[groups] name = ["BTC", ...]`

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweeplab_core::data::{CsvDirectoryProvider, PriceProvider, SyntheticProvider};
use sweeplab_core::domain::EvaluationResult;
use sweeplab_core::engine::{validate_fee, EngineError, WindowConfig, DEFAULT_FEE};
use sweeplab_core::error::{Categorized, ErrorCategory};
use sweeplab_core::signals::{IndicatorError, IndicatorKind};

use crate::aggregate::EvaluationSettings;
use crate::grid::{GridError, ParamGrid};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("grid file has no [{indicator}.{variant}] table")]
    UnknownVariant { indicator: String, variant: String },
    #[error("unknown sort field '{0}' (expected one of: s, diff, bah, s_no_fee, pct_invested)")]
    UnknownSortField(String),
    #[error("symbols not available from the price provider: {}", .missing.join(", "))]
    MissingSymbols { missing: Vec<String> },
    #[error("no grid configured: set `grid_file` or an inline `[grid]` table")]
    NoGrid,
    #[error("invalid setting: {0}")]
    Invalid(String),
}

impl Categorized for ConfigError {
    fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::Io { .. } => ErrorCategory::Persistence,
            _ => ErrorCategory::Validation,
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, text: &str) -> Result<T, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

// ─── Sort field ──────────────────────────────────────────────────────

/// Which aggregated metric ranks combinations (always descending).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortField {
    #[default]
    S,
    Diff,
    BuyAndHold,
    SNoFee,
    PctInvested,
}

impl SortField {
    pub fn extract(&self, r: &EvaluationResult) -> f64 {
        match self {
            Self::S => r.s,
            Self::Diff => r.diff,
            Self::BuyAndHold => r.bah,
            Self::SNoFee => r.s_no_fee,
            Self::PctInvested => r.pct_invested,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "s",
            Self::Diff => "diff",
            Self::BuyAndHold => "bah",
            Self::SNoFee => "s_no_fee",
            Self::PctInvested => "pct_invested",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" => Ok(Self::S),
            "diff" => Ok(Self::Diff),
            "bah" => Ok(Self::BuyAndHold),
            "s_no_fee" => Ok(Self::SNoFee),
            "pct_invested" => Ok(Self::PctInvested),
            _ => Err(ConfigError::UnknownSortField(s.to_string())),
        }
    }
}

impl TryFrom<String> for SortField {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SortField> for String {
    fn from(f: SortField) -> Self {
        f.as_str().to_string()
    }
}

// ─── Course selection ────────────────────────────────────────────────

/// Where the sweep's symbols come from.
///
/// A bare string names a group in the course-selection file; a string that
/// is not a group key is taken as a single symbol. A list is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymbolSource {
    Group(String),
    List(Vec<String>),
}

impl Default for SymbolSource {
    fn default() -> Self {
        SymbolSource::Group("default".to_string())
    }
}

impl SymbolSource {
    /// Short label for output file names.
    pub fn label(&self) -> String {
        match self {
            SymbolSource::Group(name) => name.clone(),
            SymbolSource::List(list) if list.len() == 1 => list[0].clone(),
            SymbolSource::List(list) => format!("{}symbols", list.len()),
        }
    }
}

/// Named symbol groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSelection {
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl CourseSelection {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        parse(path, &read(path)?)
    }

    /// Resolve a source to a symbol list, in listed order, de-duplicated.
    pub fn resolve(&self, source: &SymbolSource) -> Vec<String> {
        let raw: Vec<String> = match source {
            SymbolSource::Group(key) => match self.groups.get(key) {
                Some(symbols) => symbols.clone(),
                None => vec![key.clone()],
            },
            SymbolSource::List(list) => list.clone(),
        };
        let mut seen = std::collections::HashSet::new();
        raw.into_iter().filter(|s| seen.insert(s.clone())).collect()
    }

    /// Resolve and verify every symbol is available from `provider`.
    pub fn resolve_available(
        &self,
        source: &SymbolSource,
        provider: &dyn PriceProvider,
    ) -> Result<Vec<String>, ConfigError> {
        let symbols = self.resolve(source);
        let missing: Vec<String> = symbols
            .iter()
            .filter(|s| !provider.contains(s))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingSymbols { missing });
        }
        if symbols.is_empty() {
            return Err(ConfigError::Invalid("symbol selection is empty".into()));
        }
        Ok(symbols)
    }
}

// ─── Grid file ───────────────────────────────────────────────────────

/// Load `[<indicator>.<variant>]` from a grid file.
pub fn load_grid(path: &Path, kind: IndicatorKind, variant: &str) -> Result<ParamGrid, ConfigError> {
    let doc: toml::value::Table = parse(path, &read(path)?)?;
    grid_from_table(&doc, kind, variant)
}

pub fn grid_from_table(
    doc: &toml::value::Table,
    kind: IndicatorKind,
    variant: &str,
) -> Result<ParamGrid, ConfigError> {
    let unknown = || ConfigError::UnknownVariant {
        indicator: kind.to_string(),
        variant: variant.to_string(),
    };
    let section = doc
        .iter()
        .find(|(k, _)| k.parse::<IndicatorKind>().ok() == Some(kind))
        .map(|(_, v)| v)
        .and_then(toml::Value::as_table)
        .ok_or_else(unknown)?;
    let table = section
        .get(variant)
        .and_then(toml::Value::as_table)
        .ok_or_else(unknown)?;
    Ok(ParamGrid::from_toml_table(table)?)
}

// ─── Data source ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory of `<SYMBOL>.csv` files.
    pub dir: PathBuf,
    /// Generate seeded random walks instead of reading files.
    pub synthetic: bool,
    pub synthetic_days: usize,
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            synthetic: false,
            synthetic_days: 1500,
            seed: 42,
        }
    }
}

impl DataConfig {
    pub fn provider(&self) -> Box<dyn PriceProvider> {
        if self.synthetic {
            Box::new(SyntheticProvider::new(self.seed, self.synthetic_days))
        } else {
            Box::new(CsvDirectoryProvider::new(self.dir.clone()))
        }
    }
}

// ─── Sweep configuration ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub indicator: IndicatorKind,
    /// Table name under `[<indicator>]` in the grid file.
    pub variant: String,
    pub grid_file: Option<PathBuf>,
    /// Inline grid; takes precedence over `grid_file`.
    pub grid: Option<ParamGrid>,
    pub symbols: SymbolSource,
    pub courses_file: Option<PathBuf>,
    pub data: DataConfig,
    pub window: WindowConfig,
    pub fee: f64,
    /// Series shorter than this after the warm-up cut are rejected.
    pub min_length: usize,
    /// Persist the sorted results every N combinations.
    pub checkpoint_every: usize,
    pub top_k: usize,
    pub sort_by: SortField,
    /// 1 = sequential; more evaluates combinations on a rayon pool.
    pub threads: usize,
    /// Per-combination deadline in seconds.
    pub timeout_secs: Option<f64>,
    /// Combinations to time before the run (0 = skip).
    pub pretest: usize,
    /// Skip combinations already present in the checkpoint file.
    pub resume: bool,
    pub output_dir: PathBuf,
    /// Fixed result file stem; generated from indicator, selection and time when unset.
    pub run_name: Option<String>,
    pub persist_retries: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            indicator: IndicatorKind::Rsi,
            variant: "default".to_string(),
            grid_file: None,
            grid: None,
            symbols: SymbolSource::default(),
            courses_file: None,
            data: DataConfig::default(),
            window: WindowConfig::default(),
            fee: DEFAULT_FEE,
            min_length: 600,
            checkpoint_every: 500,
            top_k: 3,
            sort_by: SortField::S,
            threads: 1,
            timeout_secs: None,
            pretest: 0,
            resume: false,
            output_dir: PathBuf::from("results"),
            run_name: None,
            persist_retries: 3,
        }
    }
}

impl SweepConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = parse(path, &read(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = parse(Path::new("<inline>"), text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()?;
        validate_fee(self.fee)?;
        if self.checkpoint_every == 0 {
            return Err(ConfigError::Invalid("checkpoint_every must be at least 1".into()));
        }
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.resume && self.run_name.is_none() {
            return Err(ConfigError::Invalid(
                "resume needs a fixed run_name to find the checkpoint".into(),
            ));
        }
        if let Some(t) = self.timeout_secs {
            if !(t.is_finite() && t > 0.0) {
                return Err(ConfigError::Invalid(format!("timeout_secs must be positive, got {t}")));
            }
        }
        Ok(())
    }

    /// Resolve the parameter grid and check it against the indicator.
    pub fn load_grid(&self) -> Result<ParamGrid, ConfigError> {
        let grid = match (&self.grid, &self.grid_file) {
            (Some(grid), _) => grid.clone(),
            (None, Some(path)) => load_grid(path, self.indicator, &self.variant)?,
            (None, None) => return Err(ConfigError::NoGrid),
        };
        grid.check_indicator(self.indicator)?;
        Ok(grid)
    }

    pub fn load_courses(&self) -> Result<CourseSelection, ConfigError> {
        match &self.courses_file {
            Some(path) => CourseSelection::from_file(path),
            None => Ok(CourseSelection::default()),
        }
    }

    pub fn settings(&self) -> EvaluationSettings {
        EvaluationSettings {
            window: self.window,
            fee: self.fee,
            min_length: self.min_length,
        }
    }

    /// Deterministic id over the full configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let hash = blake3::hash(json.as_bytes());
        hash.to_hex()[..16].to_string()
    }
}
