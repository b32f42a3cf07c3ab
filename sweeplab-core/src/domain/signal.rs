//! Discrete signal markers and the indicator frame that carries them.

use serde::{Deserialize, Serialize};

use super::position::Position;

/// A discrete marker emitted by an indicator on one day.
///
/// `Buy`/`Sell` are point events (act once), `Bullish`/`Bearish` are level
/// events (a state that holds while the condition does). Absence of a marker
/// is `None` at the use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMarker {
    Buy,
    Sell,
    Bullish,
    Bearish,
}

/// The two marker vocabularies. One indicator family uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalVocabulary {
    Point,
    Level,
}

impl SignalMarker {
    pub fn vocabulary(&self) -> SignalVocabulary {
        match self {
            SignalMarker::Buy | SignalMarker::Sell => SignalVocabulary::Point,
            SignalMarker::Bullish | SignalMarker::Bearish => SignalVocabulary::Level,
        }
    }

    /// Position implied by this marker: buy/bullish → invested, sell/bearish → flat.
    pub fn implied_position(&self) -> Position {
        match self {
            SignalMarker::Buy | SignalMarker::Bullish => Position::Invested,
            SignalMarker::Sell | SignalMarker::Bearish => Position::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalMarker::Buy => "buy",
            SignalMarker::Sell => "sell",
            SignalMarker::Bullish => "bullish",
            SignalMarker::Bearish => "bearish",
        }
    }
}

/// One named indicator output. `NaN` marks days the indicator cannot yet
/// produce a value for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl IndicatorColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Number of consecutive `NaN` values at the start of the column.
    pub fn leading_unset(&self) -> usize {
        self.values.iter().take_while(|v| v.is_nan()).count()
    }
}

/// Everything an indicator produces for one price series: its intermediate
/// columns plus the signal column, all on the price series' index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFrame {
    pub columns: Vec<IndicatorColumn>,
    pub signal: Vec<Option<SignalMarker>>,
}

impl IndicatorFrame {
    pub fn new(columns: Vec<IndicatorColumn>, signal: Vec<Option<SignalMarker>>) -> Self {
        Self { columns, signal }
    }

    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Largest leading-unset count over all indicator columns.
    pub fn warmup(&self) -> usize {
        self.columns
            .iter()
            .map(IndicatorColumn::leading_unset)
            .max()
            .unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&IndicatorColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Count of non-empty markers.
    pub fn marker_count(&self) -> usize {
        self.signal.iter().filter(|m| m.is_some()).count()
    }
}
