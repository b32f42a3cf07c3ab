//! Summary statistics for one evaluated span and their reductions.
//!
//! Returns are cumulative factors: 1.0 means breakeven, 1.25 means +25%.
//! `diff` is the factor difference `s - bah`, so 0.0 means on par with
//! buy-and-hold.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Fee-adjusted strategy return factor.
    pub s: f64,
    /// Buy-and-hold return factor.
    pub bah: f64,
    /// `s - bah`.
    pub diff: f64,
    /// Fraction of days invested, in `[0, 1]`.
    pub pct_invested: f64,
    /// Strategy return factor without fees.
    pub s_no_fee: f64,
    /// Position changes (averaged when reduced).
    pub trades: f64,
}

impl EvaluationResult {
    fn fields(&self) -> [f64; 6] {
        [
            self.s,
            self.bah,
            self.diff,
            self.pct_invested,
            self.s_no_fee,
            self.trades,
        ]
    }

    fn from_fields(f: [f64; 6]) -> Self {
        Self {
            s: f[0],
            bah: f[1],
            diff: f[2],
            pct_invested: f[3],
            s_no_fee: f[4],
            trades: f[5],
        }
    }

    /// Field-wise arithmetic mean, accumulated in slice order.
    ///
    /// Returns `None` for an empty slice.
    pub fn mean(results: &[EvaluationResult]) -> Option<EvaluationResult> {
        if results.is_empty() {
            return None;
        }
        let n = results.len() as f64;
        let mut sums = [0.0; 6];
        for r in results {
            for (acc, v) in sums.iter_mut().zip(r.fields()) {
                *acc += v;
            }
        }
        Some(Self::from_fields(sums.map(|s| s / n)))
    }

    /// Field-wise sample standard deviation (n − 1). Zero for fewer than two
    /// results.
    pub fn std(results: &[EvaluationResult]) -> Option<EvaluationResult> {
        let mean = Self::mean(results)?;
        if results.len() < 2 {
            return Some(Self::from_fields([0.0; 6]));
        }
        let m = mean.fields();
        let mut sq = [0.0; 6];
        for r in results {
            for ((acc, v), mu) in sq.iter_mut().zip(r.fields()).zip(m) {
                *acc += (v - mu) * (v - mu);
            }
        }
        let denom = (results.len() - 1) as f64;
        Some(Self::from_fields(sq.map(|s| (s / denom).sqrt())))
    }
}
