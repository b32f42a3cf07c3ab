//! Per-window summary metrics.

use crate::domain::{EvaluationResult, Position};

use super::accumulate::accumulate;
use super::EngineError;

/// Evaluate one window's price and position slice.
///
/// The slice must be non-empty and fully resolved; callers drop unknown
/// rows before splitting into windows.
pub fn evaluate_window(
    closes: &[f64],
    positions: &[Option<Position>],
    fee: f64,
) -> Result<EvaluationResult, EngineError> {
    if closes.is_empty() {
        return Err(EngineError::EmptyWindow);
    }
    let totals = accumulate(closes, positions, fee)?;

    Ok(EvaluationResult {
        s: totals.strategy_with_fee,
        bah: totals.benchmark,
        diff: totals.strategy_with_fee - totals.benchmark,
        pct_invested: totals.invested_days as f64 / totals.days as f64,
        s_no_fee: totals.strategy,
        trades: totals.trades as f64,
    })
}
