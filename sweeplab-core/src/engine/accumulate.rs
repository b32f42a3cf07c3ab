//! Compounding return factors for benchmark and strategy.
//!
//! For day `t >= 1` of a span (day 0 has no prior close and contributes 1):
//!
//! ```text
//! benchmark(t)  = 1 + pct(t)
//! strategy(t)   = 1 + pct(t) * position(t - 1)
//! with_fee(t)   = strategy(t) * (1 - fee)   if position(t) != position(t - 1)
//! ```
//!
//! where `pct(t) = close(t) / close(t - 1) - 1`. Totals are running products.
//! The span must be fully resolved: unknown positions are a contract
//! violation, not something to default.

use serde::{Deserialize, Serialize};

use crate::domain::Position;

use super::EngineError;

/// Default fee per position change (0.4%).
pub const DEFAULT_FEE: f64 = 0.004;

/// Final cumulative factors over a span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnTotals {
    pub benchmark: f64,
    pub strategy: f64,
    pub strategy_with_fee: f64,
    pub trades: usize,
    pub invested_days: usize,
    pub days: usize,
}

/// Running products, one entry per day of the span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnCurves {
    pub benchmark: Vec<f64>,
    pub strategy: Vec<f64>,
    pub strategy_with_fee: Vec<f64>,
}

pub fn validate_fee(fee: f64) -> Result<(), EngineError> {
    if !(0.0..1.0).contains(&fee) {
        return Err(EngineError::InvalidFee(fee));
    }
    Ok(())
}

/// Checks shared by totals and curves; returns the resolved positions.
fn resolve(
    closes: &[f64],
    positions: &[Option<Position>],
    fee: f64,
) -> Result<Vec<Position>, EngineError> {
    validate_fee(fee)?;
    if closes.len() != positions.len() {
        return Err(EngineError::LengthMismatch {
            prices: closes.len(),
            positions: positions.len(),
        });
    }
    positions
        .iter()
        .enumerate()
        .map(|(index, p)| p.ok_or(EngineError::UnresolvedPosition { index }))
        .collect()
}

/// Per-day factors `(benchmark, strategy, with_fee, traded)` for day `t >= 1`.
#[inline]
fn day_factors(closes: &[f64], pos: &[Position], t: usize, fee: f64) -> (f64, f64, f64, bool) {
    let pct = closes[t] / closes[t - 1] - 1.0;
    let bench = 1.0 + pct;
    let strat = 1.0 + pct * pos[t - 1].exposure();
    let traded = pos[t] != pos[t - 1];
    let with_fee = if traded { strat * (1.0 - fee) } else { strat };
    (bench, strat, with_fee, traded)
}

/// Cumulative totals over the whole span.
pub fn accumulate(
    closes: &[f64],
    positions: &[Option<Position>],
    fee: f64,
) -> Result<ReturnTotals, EngineError> {
    let pos = resolve(closes, positions, fee)?;

    let mut totals = ReturnTotals {
        benchmark: 1.0,
        strategy: 1.0,
        strategy_with_fee: 1.0,
        trades: 0,
        invested_days: pos.iter().filter(|p| p.is_invested()).count(),
        days: pos.len(),
    };

    for t in 1..pos.len() {
        let (bench, strat, with_fee, traded) = day_factors(closes, &pos, t, fee);
        totals.benchmark *= bench;
        totals.strategy *= strat;
        totals.strategy_with_fee *= with_fee;
        if traded {
            totals.trades += 1;
        }
    }

    Ok(totals)
}

/// Running-product curves. The last element of each curve equals the
/// matching total from [`accumulate`].
pub fn accumulate_curves(
    closes: &[f64],
    positions: &[Option<Position>],
    fee: f64,
) -> Result<ReturnCurves, EngineError> {
    let pos = resolve(closes, positions, fee)?;
    let n = pos.len();
    let mut curves = ReturnCurves {
        benchmark: Vec::with_capacity(n),
        strategy: Vec::with_capacity(n),
        strategy_with_fee: Vec::with_capacity(n),
    };
    if n == 0 {
        return Ok(curves);
    }

    let (mut b, mut s, mut f) = (1.0, 1.0, 1.0);
    curves.benchmark.push(b);
    curves.strategy.push(s);
    curves.strategy_with_fee.push(f);
    for t in 1..n {
        let (bench, strat, with_fee, _) = day_factors(closes, &pos, t, fee);
        b *= bench;
        s *= strat;
        f *= with_fee;
        curves.benchmark.push(b);
        curves.strategy.push(s);
        curves.strategy_with_fee.push(f);
    }
    Ok(curves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const I: Option<Position> = Some(Position::Invested);
    const F: Option<Position> = Some(Position::Flat);

    #[test]
    fn always_invested_tracks_benchmark() {
        let closes = [10.0, 12.0, 9.0, 15.0];
        let t = accumulate(&closes, &[I, I, I, I], 0.0).unwrap();
        assert!((t.benchmark - 1.5).abs() < 1e-12);
        assert_eq!(t.strategy, t.benchmark);
        assert_eq!(t.trades, 0);
        assert_eq!(t.invested_days, 4);
    }

    #[test]
    fn never_invested_is_flat_strategy() {
        let closes = [10.0, 20.0, 5.0];
        let t = accumulate(&closes, &[F, F, F], DEFAULT_FEE).unwrap();
        assert_eq!(t.strategy, 1.0);
        assert_eq!(t.strategy_with_fee, 1.0);
        assert!((t.benchmark - 0.5).abs() < 1e-12);
    }

    #[test]
    fn return_uses_previous_day_position() {
        // Enter on day 1: the 1→2 move is captured, the 0→1 move is not.
        let closes = [1.0, 2.0, 4.0];
        let t = accumulate(&closes, &[F, I, I], 0.0).unwrap();
        assert!((t.strategy - 2.0).abs() < 1e-12);
        assert_eq!(t.trades, 1);
    }

    #[test]
    fn fee_charged_per_change() {
        let closes = [1.0, 1.0, 1.0, 1.0];
        let t = accumulate(&closes, &[F, I, F, I], 0.01).unwrap();
        assert_eq!(t.trades, 3);
        assert!((t.strategy_with_fee - 0.99_f64.powi(3)).abs() < 1e-12);
        assert_eq!(t.strategy, 1.0);
    }

    #[test]
    fn unknown_position_fails_fast() {
        let err = accumulate(&[1.0, 2.0], &[I, None], 0.0).unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedPosition { index: 1 }));
        assert_eq!(
            crate::error::Categorized::category(&err),
            crate::error::ErrorCategory::DataIntegrity
        );
    }

    #[test]
    fn rejects_mismatched_lengths_and_bad_fee() {
        assert!(matches!(
            accumulate(&[1.0, 2.0], &[I], 0.0),
            Err(EngineError::LengthMismatch { prices: 2, positions: 1 })
        ));
        assert!(matches!(
            accumulate(&[1.0], &[I], 1.0),
            Err(EngineError::InvalidFee(_))
        ));
        assert!(matches!(
            accumulate(&[1.0], &[I], -0.1),
            Err(EngineError::InvalidFee(_))
        ));
    }

    #[test]
    fn curves_end_at_totals() {
        let closes = [1.0, 2.0, 4.0, 3.0, 6.0];
        let pos = [F, I, I, F, I];
        let t = accumulate(&closes, &pos, DEFAULT_FEE).unwrap();
        let c = accumulate_curves(&closes, &pos, DEFAULT_FEE).unwrap();
        assert_eq!(c.benchmark.len(), 5);
        assert_eq!(c.benchmark[0], 1.0);
        assert_eq!(*c.benchmark.last().unwrap(), t.benchmark);
        assert_eq!(*c.strategy.last().unwrap(), t.strategy);
        assert_eq!(*c.strategy_with_fee.last().unwrap(), t.strategy_with_fee);
    }

    fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.5f64..500.0, 2..200)
    }

    proptest! {
        #[test]
        fn fully_invested_fee_free_equals_benchmark(closes in arb_closes()) {
            let pos = vec![I; closes.len()];
            let t = accumulate(&closes, &pos, 0.0).unwrap();
            prop_assert_eq!(t.strategy, t.benchmark);
            prop_assert_eq!(t.strategy_with_fee, t.benchmark);
        }

        #[test]
        fn higher_fee_never_helps(
            closes in arb_closes(),
            flips in prop::collection::vec(any::<bool>(), 200),
            fee_lo in 0.0f64..0.05,
            fee_step in 0.0f64..0.05,
        ) {
            let pos: Vec<_> = closes
                .iter()
                .zip(&flips)
                .map(|(_, &b)| if b { I } else { F })
                .collect();
            let lo = accumulate(&closes, &pos, fee_lo).unwrap();
            let hi = accumulate(&closes, &pos, fee_lo + fee_step).unwrap();
            if lo.trades == 0 {
                prop_assert_eq!(lo.strategy_with_fee, hi.strategy_with_fee);
            } else {
                prop_assert!(hi.strategy_with_fee <= lo.strategy_with_fee);
            }
        }
    }
}
