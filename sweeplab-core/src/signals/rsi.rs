//! RSI level signal: bullish below the lower border, bearish above the upper.

use crate::domain::{IndicatorColumn, IndicatorFrame, ParameterCombination, PriceSeries, SignalMarker};
use crate::indicators::rsi;

use super::{check_names, invalid, require, require_period, IndicatorError, SignalIndicator};

pub const PARAMS: &[&str] = &["length", "bl", "bu"];

#[derive(Debug, Clone)]
pub struct RsiSignal {
    length: usize,
    lower: f64,
    upper: f64,
    name: String,
}

impl RsiSignal {
    pub fn new(length: usize, lower: f64, upper: f64) -> Result<Self, IndicatorError> {
        let params = ParameterCombination::new()
            .with("length", length as f64)
            .with("bl", lower)
            .with("bu", upper);
        Self::from_params(&params)
    }

    pub fn from_params(params: &ParameterCombination) -> Result<Self, IndicatorError> {
        check_names("rsi", params, PARAMS)?;
        let length = require_period("rsi", params, "length")?;
        let lower = require("rsi", params, "bl")?;
        let upper = require("rsi", params, "bu")?;
        if !(0.0..=100.0).contains(&lower) {
            return Err(invalid("rsi", "bl", lower, "must lie in [0, 100]"));
        }
        if !(0.0..=100.0).contains(&upper) || upper <= lower {
            return Err(invalid("rsi", "bu", upper, "must lie in [0, 100] above bl"));
        }
        Ok(Self {
            length,
            lower,
            upper,
            name: format!("rsi({length}, {lower}, {upper})"),
        })
    }
}

impl SignalIndicator for RsiSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.length
    }

    fn compute(&self, prices: &PriceSeries) -> Result<IndicatorFrame, IndicatorError> {
        self.check_history(prices)?;
        let values = rsi(&prices.closes(), self.length);

        let signal = values
            .iter()
            .map(|&v| {
                if v < self.lower {
                    Some(SignalMarker::Bullish)
                } else if v > self.upper {
                    Some(SignalMarker::Bearish)
                } else {
                    None
                }
            })
            .collect();

        Ok(IndicatorFrame::new(
            vec![IndicatorColumn::new(format!("rsi_{}", self.length), values)],
            signal,
        ))
    }
}
