//! Multi-window evaluation of one (symbol, parameter combination).
//!
//! Pipeline: indicator frame → positions → cut the unknown prefix →
//! minimum-length gate → overlapping windows → per-window evaluation →
//! field-wise mean (and sample std) across windows.

use thiserror::Error;

use sweeplab_core::domain::{leading_unknown, EvaluationResult, PriceSeries};
use sweeplab_core::engine::{
    derive_positions, evaluate_window, split_windows, EngineError, WindowConfig, DEFAULT_FEE,
};
use sweeplab_core::error::{Categorized, ErrorCategory};
use sweeplab_core::signals::{IndicatorError, SignalIndicator};

/// Per-symbol evaluation settings shared by every combination of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSettings {
    pub window: WindowConfig,
    pub fee: f64,
    /// Minimum resolved days required after the warm-up cut.
    pub min_length: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            fee: DEFAULT_FEE,
            min_length: 600,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("{symbol}: {available} resolved days after warm-up, need at least {required}")]
    TooShort {
        symbol: String,
        available: usize,
        required: usize,
    },
    #[error("{symbol}: indicator never produced a usable signal")]
    NoSignal { symbol: String },
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Categorized for AggregateError {
    fn category(&self) -> ErrorCategory {
        match self {
            AggregateError::TooShort { .. } | AggregateError::NoSignal { .. } => {
                ErrorCategory::Validation
            }
            AggregateError::Indicator(e) => e.category(),
            AggregateError::Engine(e) => e.category(),
        }
    }
}

/// Averaged statistics for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedEvaluation {
    pub mean: EvaluationResult,
    /// Sample standard deviation across windows; reported, not ranked on.
    pub std: EvaluationResult,
    pub windows: usize,
    /// Resolved days that entered the window split.
    pub evaluated_days: usize,
    /// Leading days dropped as unknown.
    pub cut: usize,
}

/// Evaluate one symbol under one indicator configuration.
pub fn evaluate_symbol(
    prices: &PriceSeries,
    indicator: &dyn SignalIndicator,
    settings: &EvaluationSettings,
) -> Result<AggregatedEvaluation, AggregateError> {
    let frame = indicator.compute(prices)?;
    let positions = derive_positions(&frame)?;

    let cut = leading_unknown(&positions);
    if cut == positions.len() {
        return Err(AggregateError::NoSignal {
            symbol: prices.symbol().to_string(),
        });
    }

    let closes = prices.closes();
    let closes = &closes[cut..];
    let positions = &positions[cut..];

    if closes.len() < settings.min_length {
        return Err(AggregateError::TooShort {
            symbol: prices.symbol().to_string(),
            available: closes.len(),
            required: settings.min_length,
        });
    }

    let windows = split_windows(closes.len(), &settings.window)?;
    let per_window = windows
        .iter()
        .map(|w| evaluate_window(&closes[w.range()], &positions[w.range()], settings.fee))
        .collect::<Result<Vec<_>, _>>()?;

    // split_windows never returns an empty list for a non-empty span
    let mean = EvaluationResult::mean(&per_window).ok_or(EngineError::EmptyWindow)?;
    let std = EvaluationResult::std(&per_window).ok_or(EngineError::EmptyWindow)?;

    tracing::trace!(
        symbol = prices.symbol(),
        indicator = indicator.name(),
        windows = per_window.len(),
        s = mean.s,
        diff = mean.diff,
        "symbol evaluated"
    );

    Ok(AggregatedEvaluation {
        mean,
        std,
        windows: per_window.len(),
        evaluated_days: closes.len(),
        cut,
    })
}
