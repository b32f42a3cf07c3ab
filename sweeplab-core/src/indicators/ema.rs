//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: SMA of the first `period` defined values.
//! Leading `NaN` input (e.g. the warm-up of another indicator) is skipped, so
//! the seed lands at `first_defined + period - 1`.

/// EMA over a slice that may start with a `NaN` warm-up.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }
    let offset = values.iter().take_while(|v| v.is_nan()).count();
    if n < offset + period {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    let mut sum = 0.0;
    for &v in &values[offset..offset + period] {
        if v.is_nan() {
            return result;
        }
        sum += v;
    }
    let seed = sum / period as f64;
    let seed_at = offset + period - 1;
    result[seed_at] = seed;

    let mut prev = seed;
    for i in (seed_at + 1)..n {
        if values[i].is_nan() {
            // NaN after the seed taints everything that follows
            return result;
        }
        let v = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = v;
        prev = v;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn period_1_equals_input() {
        let r = ema(&[100.0, 200.0, 300.0], 1);
        assert_approx(r[0], 100.0, DEFAULT_EPSILON);
        assert_approx(r[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn period_3_known_values() {
        // alpha = 0.5; seed = mean(2,4,6) = 4; next = 0.5*8 + 0.5*4 = 6
        let r = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!(r[0].is_nan() && r[1].is_nan());
        assert_approx(r[2], 4.0, DEFAULT_EPSILON);
        assert_approx(r[3], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn skips_leading_nan() {
        let r = ema(&[f64::NAN, f64::NAN, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(r.iter().take_while(|v| v.is_nan()).count(), 3);
        assert_approx(r[3], 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn too_short_is_all_nan() {
        assert!(ema(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
        assert!(ema(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }
}
