//! Signal indicators: price series + parameters → indicator frame.
//!
//! Each handler computes its indicator columns and a signal column on the
//! price index. Markers are only emitted where every input the rule reads is
//! defined, so the frame's warm-up (largest leading-`NaN` count) bounds where
//! markers can appear.
//!
//! Handlers are built through the closed [`IndicatorKind`] registry, which
//! validates parameter names and domains up front.

pub mod bollinger;
pub mod macd;
pub mod registry;
pub mod rsi;

pub use bollinger::BollingerSignal;
pub use macd::MacdSignal;
pub use registry::IndicatorKind;
pub use rsi::RsiSignal;

use std::fmt;

use thiserror::Error;

use crate::domain::{IndicatorFrame, ParameterCombination, PriceSeries};
use crate::error::{Categorized, ErrorCategory};

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("unknown indicator '{0}' (expected one of: rsi, bb, macd)")]
    UnknownIndicator(String),
    #[error("{indicator}: missing parameter '{name}'")]
    MissingParam { indicator: String, name: String },
    #[error("{indicator}: unknown parameter '{name}'")]
    UnknownParam { indicator: String, name: String },
    #[error("{indicator}: parameter '{name}' = {value} is invalid: {reason}")]
    InvalidParam {
        indicator: String,
        name: String,
        value: f64,
        reason: &'static str,
    },
    #[error("{indicator}: needs more than {needed} prices, got {available}")]
    InsufficientHistory {
        indicator: String,
        needed: usize,
        available: usize,
    },
}

impl Categorized for IndicatorError {
    fn category(&self) -> ErrorCategory {
        match self {
            IndicatorError::InsufficientHistory { .. } => ErrorCategory::TransientProvider,
            _ => ErrorCategory::Validation,
        }
    }
}

// ─── Trait ───────────────────────────────────────────────────────────

/// A parameterized indicator that emits discrete signal markers.
///
/// Implementations must be causal: the frame value at index `t` may only
/// depend on prices at indices `<= t`.
pub trait SignalIndicator: fmt::Debug + Send + Sync {
    /// Label including parameters, e.g. `rsi(14, 30, 70)`.
    fn name(&self) -> &str;

    /// Samples consumed before the first signal can be emitted.
    fn lookback(&self) -> usize;

    fn compute(&self, prices: &PriceSeries) -> Result<IndicatorFrame, IndicatorError>;

    /// Fails with `InsufficientHistory` when the series cannot leave warm-up.
    fn check_history(&self, prices: &PriceSeries) -> Result<(), IndicatorError> {
        if prices.len() <= self.lookback() {
            return Err(IndicatorError::InsufficientHistory {
                indicator: self.name().to_string(),
                needed: self.lookback(),
                available: prices.len(),
            });
        }
        Ok(())
    }
}

// ─── Parameter helpers ───────────────────────────────────────────────

/// Reject parameter names the indicator does not understand.
pub(crate) fn check_names(
    indicator: &str,
    params: &ParameterCombination,
    known: &[&str],
) -> Result<(), IndicatorError> {
    for name in params.names() {
        if !known.contains(&name) {
            return Err(IndicatorError::UnknownParam {
                indicator: indicator.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

pub(crate) fn require(
    indicator: &str,
    params: &ParameterCombination,
    name: &str,
) -> Result<f64, IndicatorError> {
    let value = params.get(name).ok_or_else(|| IndicatorError::MissingParam {
        indicator: indicator.to_string(),
        name: name.to_string(),
    })?;
    if !value.is_finite() {
        return Err(invalid(indicator, name, value, "must be finite"));
    }
    Ok(value)
}

/// A whole number of days, at least 1.
pub(crate) fn require_period(
    indicator: &str,
    params: &ParameterCombination,
    name: &str,
) -> Result<usize, IndicatorError> {
    let value = require(indicator, params, name)?;
    if value < 1.0 || value.fract() != 0.0 {
        return Err(invalid(indicator, name, value, "must be a whole number >= 1"));
    }
    Ok(value as usize)
}

pub(crate) fn invalid(indicator: &str, name: &str, value: f64, reason: &'static str) -> IndicatorError {
    IndicatorError::InvalidParam {
        indicator: indicator.to_string(),
        name: name.to_string(),
        value,
        reason,
    }
}

#[cfg(test)]
pub(crate) fn test_series(closes: &[f64]) -> PriceSeries {
    let start = chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    PriceSeries::from_closes("TEST", start, closes).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_must_be_whole_and_positive() {
        let p = ParameterCombination::new()
            .with("a", 2.5)
            .with("b", 0.0)
            .with("c", 7.0);
        assert!(require_period("x", &p, "a").is_err());
        assert!(require_period("x", &p, "b").is_err());
        assert_eq!(require_period("x", &p, "c").unwrap(), 7);
        assert!(matches!(
            require_period("x", &p, "d"),
            Err(IndicatorError::MissingParam { .. })
        ));
    }

    #[test]
    fn unknown_names_rejected() {
        let p = ParameterCombination::new().with("length", 3.0).with("oops", 1.0);
        let err = check_names("rsi", &p, &["length"]).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::UnknownParam {
                indicator: "rsi".into(),
                name: "oops".into()
            }
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn insufficient_history_is_transient() {
        let err = IndicatorError::InsufficientHistory {
            indicator: "rsi".into(),
            needed: 14,
            available: 3,
        };
        assert_eq!(err.category(), ErrorCategory::TransientProvider);
    }
}
