//! Moving Average Convergence Divergence (MACD).
//!
//! - MACD line: EMA(close, fast) - EMA(close, slow)
//! - Signal line: EMA(MACD line, signal)
//! - Histogram: MACD line - signal line
//!
//! The MACD line is defined from `slow - 1`; the signal line and histogram
//! from `slow + signal - 2`.

use super::ema::ema;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub macd: Vec<f64>,
    pub histogram: Vec<f64>,
    pub signal: Vec<f64>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdLines {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    MacdLines {
        macd: line,
        histogram,
        signal: signal_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn warmup_lengths() {
        let m = macd(&ramp(40), 3, 6, 4);
        assert_eq!(m.macd.iter().take_while(|v| v.is_nan()).count(), 5);
        assert_eq!(m.signal.iter().take_while(|v| v.is_nan()).count(), 8);
        assert_eq!(m.histogram.iter().take_while(|v| v.is_nan()).count(), 8);
    }

    #[test]
    fn rising_series_has_positive_macd() {
        let m = macd(&ramp(60), 5, 10, 3);
        assert!(m.macd[59] > 0.0);
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let m = macd(&closes, 4, 9, 3);
        for i in 12..50 {
            assert_approx(m.histogram[i], m.macd[i] - m.signal[i], DEFAULT_EPSILON);
        }
    }
}
