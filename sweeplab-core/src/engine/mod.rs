//! Evaluation engine: windows, position derivation, return accumulation.
//!
//! Pipeline for one (symbol, parameter set):
//! 1. `derive_positions` turns the indicator's signal column into positions
//! 2. leading unknown days are cut by the caller
//! 3. `split_windows` cuts the resolved span into overlapping windows
//! 4. `evaluate_window` computes returns per window via `accumulate`

pub mod accumulate;
pub mod derive;
pub mod evaluate;
pub mod window;

pub use accumulate::{
    accumulate, accumulate_curves, validate_fee, ReturnCurves, ReturnTotals, DEFAULT_FEE,
};
pub use derive::{check_vocabulary, derive_positions, resolved_from};
pub use evaluate::evaluate_window;
pub use window::{split_windows, Window, WindowConfig};

use thiserror::Error;

use crate::error::{Categorized, ErrorCategory};

/// Errors from the evaluation engine.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("window length must be positive")]
    ZeroWindowLength,
    #[error("window overlap {overlap} must be smaller than window length {length}")]
    OverlapTooLarge { overlap: usize, length: usize },
    #[error("signal column mixes point and level markers (first conflict at index {index})")]
    MixedVocabulary { index: usize },
    #[error("length mismatch: {prices} prices vs {positions} positions")]
    LengthMismatch { prices: usize, positions: usize },
    #[error("unresolved position at index {index}")]
    UnresolvedPosition { index: usize },
    #[error("fee must satisfy 0 <= fee < 1, got {0}")]
    InvalidFee(f64),
    #[error("cannot evaluate an empty window")]
    EmptyWindow,
}

impl Categorized for EngineError {
    fn category(&self) -> ErrorCategory {
        match self {
            EngineError::UnresolvedPosition { .. } => ErrorCategory::DataIntegrity,
            _ => ErrorCategory::Validation,
        }
    }
}
