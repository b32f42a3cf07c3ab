//! Indicator registry: parses indicator names and builds typed handlers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::ParameterCombination;

use super::{bollinger, macd, rsi};
use super::{BollingerSignal, IndicatorError, MacdSignal, RsiSignal, SignalIndicator};

/// The supported indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndicatorKind {
    Rsi,
    Bollinger,
    Macd,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 3] = [
        IndicatorKind::Rsi,
        IndicatorKind::Bollinger,
        IndicatorKind::Macd,
    ];

    /// Short name used in grid files and output file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Bollinger => "bb",
            IndicatorKind::Macd => "macd",
        }
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Rsi => rsi::PARAMS,
            IndicatorKind::Bollinger => bollinger::PARAMS,
            IndicatorKind::Macd => macd::PARAMS,
        }
    }

    /// Conventional default parameters.
    pub fn default_params(&self) -> ParameterCombination {
        match self {
            IndicatorKind::Rsi => ParameterCombination::new()
                .with("length", 14.0)
                .with("bl", 30.0)
                .with("bu", 70.0),
            IndicatorKind::Bollinger => ParameterCombination::new()
                .with("length", 20.0)
                .with("std", 2.0),
            IndicatorKind::Macd => ParameterCombination::new()
                .with("fast", 12.0)
                .with("slow", 26.0)
                .with("signal", 9.0),
        }
    }

    /// Build a handler, validating parameter names and domains.
    pub fn build(
        &self,
        params: &ParameterCombination,
    ) -> Result<Box<dyn SignalIndicator>, IndicatorError> {
        let handler: Box<dyn SignalIndicator> = match self {
            IndicatorKind::Rsi => Box::new(RsiSignal::from_params(params)?),
            IndicatorKind::Bollinger => Box::new(BollingerSignal::from_params(params)?),
            IndicatorKind::Macd => Box::new(MacdSignal::from_params(params)?),
        };
        Ok(handler)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsi" => Ok(IndicatorKind::Rsi),
            "bb" | "bollinger" | "bbands" => Ok(IndicatorKind::Bollinger),
            "macd" => Ok(IndicatorKind::Macd),
            _ => Err(IndicatorError::UnknownIndicator(s.to_string())),
        }
    }
}

impl TryFrom<String> for IndicatorKind {
    type Error = IndicatorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IndicatorKind> for String {
    fn from(kind: IndicatorKind) -> Self {
        kind.as_str().to_string()
    }
}
