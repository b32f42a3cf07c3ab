//! MACD crossover signal: buy when the MACD line crosses above its signal
//! line, sell when it crosses below.

use crate::domain::{IndicatorColumn, IndicatorFrame, ParameterCombination, PriceSeries, SignalMarker};
use crate::indicators::macd;

use super::{check_names, invalid, require_period, IndicatorError, SignalIndicator};

pub const PARAMS: &[&str] = &["fast", "slow", "signal"];

#[derive(Debug, Clone)]
pub struct MacdSignal {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl MacdSignal {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, IndicatorError> {
        let params = ParameterCombination::new()
            .with("fast", fast as f64)
            .with("slow", slow as f64)
            .with("signal", signal as f64);
        Self::from_params(&params)
    }

    pub fn from_params(params: &ParameterCombination) -> Result<Self, IndicatorError> {
        check_names("macd", params, PARAMS)?;
        let fast = require_period("macd", params, "fast")?;
        let slow = require_period("macd", params, "slow")?;
        let signal = require_period("macd", params, "signal")?;
        if fast >= slow {
            return Err(invalid("macd", "slow", slow as f64, "must be greater than fast"));
        }
        Ok(Self {
            fast,
            slow,
            signal,
            name: format!("macd({fast}, {slow}, {signal})"),
        })
    }
}

impl SignalIndicator for MacdSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        // first crossing needs one defined spread before the current one
        self.slow + self.signal - 1
    }

    fn compute(&self, prices: &PriceSeries) -> Result<IndicatorFrame, IndicatorError> {
        self.check_history(prices)?;
        let lines = macd(&prices.closes(), self.fast, self.slow, self.signal);
        let n = lines.macd.len();

        let mut signal = vec![None; n];
        for t in 1..n {
            let prev = lines.macd[t - 1] - lines.signal[t - 1];
            let cur = lines.macd[t] - lines.signal[t];
            if prev.is_nan() || cur.is_nan() {
                continue;
            }
            if prev <= 0.0 && cur > 0.0 {
                signal[t] = Some(SignalMarker::Buy);
            } else if prev >= 0.0 && cur < 0.0 {
                signal[t] = Some(SignalMarker::Sell);
            }
        }

        let suffix = format!("{}_{}_{}", self.fast, self.slow, self.signal);
        Ok(IndicatorFrame::new(
            vec![
                IndicatorColumn::new(format!("macd_{suffix}"), lines.macd),
                IndicatorColumn::new(format!("macd_hist_{suffix}"), lines.histogram),
                IndicatorColumn::new(format!("macd_signal_{suffix}"), lines.signal),
            ],
            signal,
        ))
    }
}
