//! Bollinger level signal: bullish at or below the lower band, bearish at or
//! above the upper band, no marker inside the bands.

use crate::domain::{IndicatorColumn, IndicatorFrame, ParameterCombination, PriceSeries, SignalMarker};
use crate::indicators::bollinger;

use super::{check_names, invalid, require, require_period, IndicatorError, SignalIndicator};

pub const PARAMS: &[&str] = &["length", "std"];

#[derive(Debug, Clone)]
pub struct BollingerSignal {
    length: usize,
    std: f64,
    name: String,
}

impl BollingerSignal {
    pub fn new(length: usize, std: f64) -> Result<Self, IndicatorError> {
        let params = ParameterCombination::new()
            .with("length", length as f64)
            .with("std", std);
        Self::from_params(&params)
    }

    pub fn from_params(params: &ParameterCombination) -> Result<Self, IndicatorError> {
        check_names("bb", params, PARAMS)?;
        let length = require_period("bb", params, "length")?;
        let std = require("bb", params, "std")?;
        if std < 0.0 {
            return Err(invalid("bb", "std", std, "must be non-negative"));
        }
        Ok(Self {
            length,
            std,
            name: format!("bb({length}, {std})"),
        })
    }
}

impl SignalIndicator for BollingerSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.length.saturating_sub(1)
    }

    fn compute(&self, prices: &PriceSeries) -> Result<IndicatorFrame, IndicatorError> {
        self.check_history(prices)?;
        let closes = prices.closes();
        let bands = bollinger(&closes, self.length, self.std);

        // Bullish wins when the bands collapse onto the close.
        let signal = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if c <= bands.lower[i] {
                    Some(SignalMarker::Bullish)
                } else if c >= bands.upper[i] {
                    Some(SignalMarker::Bearish)
                } else {
                    None
                }
            })
            .collect();

        let suffix = format!("{}_{}", self.length, self.std);
        Ok(IndicatorFrame::new(
            vec![
                IndicatorColumn::new(format!("bb_lower_{suffix}"), bands.lower),
                IndicatorColumn::new(format!("bb_middle_{suffix}"), bands.middle),
                IndicatorColumn::new(format!("bb_upper_{suffix}"), bands.upper),
            ],
            signal,
        ))
    }
}
