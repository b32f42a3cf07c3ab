//! Parameter grids: per-parameter value lists and their cartesian product.
//!
//! An axis is either an explicit list of values or a `{ start, end, step }`
//! range. Ranges expand to `round(start + i * step, 10)` for
//! `i in 0..=floor((end - start) / step)`, so the end is included when it
//! lands on a step. A 1e-9 tolerance absorbs float drift in the division.
//!
//! Combinations are produced in stable order: axes sorted by name, the
//! first axis varying slowest, values in listed order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweeplab_core::domain::ParameterCombination;
use sweeplab_core::error::{Categorized, ErrorCategory};
use sweeplab_core::signals::IndicatorKind;

const RANGE_TOLERANCE: f64 = 1e-9;

/// Upper bound on the values one range may expand to.
pub const MAX_AXIS_VALUES: usize = 1_000_000;
/// Upper bound on the number of combinations in one grid.
pub const MAX_COMBINATIONS: usize = 10_000_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("grid has no parameters")]
    Empty,
    #[error("parameter '{name}' has no values")]
    NoValues { name: String },
    #[error("parameter '{name}': {reason}")]
    InvalidRange { name: String, reason: String },
    #[error("grid expands to more than {limit} combinations")]
    TooLarge { limit: usize },
    #[error("parameter '{name}': expected a list of numbers or a {{ start, end, step }} table, got {found}")]
    Shape { name: String, found: String },
    #[error("parameter '{name}' is not accepted by indicator '{indicator}' (expected {expected})")]
    UnknownParam {
        name: String,
        indicator: String,
        expected: String,
    },
    #[error("indicator '{indicator}' needs parameter '{name}' but the grid does not define it")]
    MissingParam { name: String, indicator: String },
}

impl Categorized for GridError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

fn total_size(axes: &[(String, Vec<f64>)]) -> Result<usize, GridError> {
    axes.iter().try_fold(1usize, |acc, (_, values)| {
        acc.checked_mul(values.len())
            .filter(|n| *n <= MAX_COMBINATIONS)
            .ok_or(GridError::TooLarge {
                limit: MAX_COMBINATIONS,
            })
    })
}

// ─── Axis ────────────────────────────────────────────────────────────

/// One parameter's candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamAxis {
    Values(Vec<f64>),
    Range { start: f64, end: f64, step: f64 },
}

fn round10(x: f64) -> f64 {
    (x * 1e10).round() / 1e10
}

impl ParamAxis {
    /// Expand to the concrete value list, validating the axis.
    pub fn expand(&self, name: &str) -> Result<Vec<f64>, GridError> {
        let invalid = |reason: &str| GridError::InvalidRange {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match self {
            ParamAxis::Values(values) => {
                if values.is_empty() {
                    return Err(GridError::NoValues {
                        name: name.to_string(),
                    });
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(invalid("values must be finite"));
                }
                Ok(values.clone())
            }
            &ParamAxis::Range { start, end, step } => {
                if !(start.is_finite() && end.is_finite() && step.is_finite()) {
                    return Err(invalid("start, end and step must be finite"));
                }
                if step <= 0.0 {
                    return Err(invalid("step must be positive"));
                }
                if end < start {
                    return Err(invalid("end must not be below start"));
                }
                let span = ((end - start) / step + RANGE_TOLERANCE).floor();
                if span >= MAX_AXIS_VALUES as f64 {
                    let reason = format!("expands to more than {MAX_AXIS_VALUES} values");
                    return Err(invalid(reason.as_str()));
                }
                let count = span as usize + 1;
                Ok((0..count)
                    .map(|i| round10(start + i as f64 * step))
                    .collect())
            }
        }
    }

    /// Convert a TOML value: an array of numbers or a `{ start, end, step }` table.
    pub fn from_toml(name: &str, value: &toml::Value) -> Result<Self, GridError> {
        let shape_err = |found: &str| GridError::Shape {
            name: name.to_string(),
            found: found.to_string(),
        };
        let number = |v: &toml::Value| -> Option<f64> {
            match v {
                toml::Value::Integer(i) => Some(*i as f64),
                toml::Value::Float(f) => Some(*f),
                _ => None,
            }
        };
        match value {
            toml::Value::Array(items) => items
                .iter()
                .map(|v| number(v).ok_or_else(|| shape_err(v.type_str())))
                .collect::<Result<Vec<_>, _>>()
                .map(ParamAxis::Values),
            toml::Value::Table(table) => {
                let field = |key: &str| -> Result<f64, GridError> {
                    table
                        .get(key)
                        .and_then(number)
                        .ok_or_else(|| shape_err(&format!("table without numeric '{key}'")))
                };
                if table.len() != 3 {
                    return Err(shape_err("table with keys other than start, end, step"));
                }
                Ok(ParamAxis::Range {
                    start: field("start")?,
                    end: field("end")?,
                    step: field("step")?,
                })
            }
            other => Err(shape_err(other.type_str())),
        }
    }
}

// ─── Grid ────────────────────────────────────────────────────────────

/// Parameter name → axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    axes: BTreeMap<String, ParamAxis>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axis(mut self, name: impl Into<String>, axis: ParamAxis) -> Self {
        self.axes.insert(name.into(), axis);
        self
    }

    pub fn axes(&self) -> &BTreeMap<String, ParamAxis> {
        &self.axes
    }

    /// Build from a TOML table of `name = axis` entries.
    pub fn from_toml_table(table: &toml::value::Table) -> Result<Self, GridError> {
        let axes = table
            .iter()
            .map(|(name, value)| Ok((name.clone(), ParamAxis::from_toml(name, value)?)))
            .collect::<Result<BTreeMap<_, _>, GridError>>()?;
        Ok(Self { axes })
    }

    /// Name-ordered expanded axes.
    pub fn expanded(&self) -> Result<Vec<(String, Vec<f64>)>, GridError> {
        if self.axes.is_empty() {
            return Err(GridError::Empty);
        }
        self.axes
            .iter()
            .map(|(name, axis)| Ok((name.clone(), axis.expand(name)?)))
            .collect()
    }

    /// Total number of combinations.
    pub fn size(&self) -> Result<usize, GridError> {
        total_size(&self.expanded()?)
    }

    /// Every combination in stable cartesian order.
    pub fn combinations(&self) -> Result<Vec<ParameterCombination>, GridError> {
        let axes = self.expanded()?;
        let total = total_size(&axes)?;
        let mut out = Vec::with_capacity(total);

        // Odometer over axis indices; the last axis turns fastest.
        let mut idx = vec![0usize; axes.len()];
        for _ in 0..total {
            out.push(
                axes.iter()
                    .zip(&idx)
                    .map(|((name, values), &i)| (name.clone(), values[i]))
                    .collect(),
            );
            for pos in (0..axes.len()).rev() {
                idx[pos] += 1;
                if idx[pos] < axes[pos].1.len() {
                    break;
                }
                idx[pos] = 0;
            }
        }
        Ok(out)
    }

    /// Check that the grid defines exactly the parameters the indicator takes.
    pub fn check_indicator(&self, kind: IndicatorKind) -> Result<(), GridError> {
        let expected = kind.param_names();
        for name in self.axes.keys() {
            if !expected.contains(&name.as_str()) {
                return Err(GridError::UnknownParam {
                    name: name.clone(),
                    indicator: kind.to_string(),
                    expected: expected.join(", "),
                });
            }
        }
        for name in expected {
            if !self.axes.contains_key(*name) {
                return Err(GridError::MissingParam {
                    name: name.to_string(),
                    indicator: kind.to_string(),
                });
            }
        }
        Ok(())
    }
}
