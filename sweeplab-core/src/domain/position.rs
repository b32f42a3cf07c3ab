//! Position state per day.

use serde::{Deserialize, Serialize};

/// Whether the strategy holds the asset entering a day.
///
/// Unknown days (indicator warm-up, no signal yet) are represented as
/// `Option::None` in a [`PositionSeries`], never as `Flat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Flat,
    Invested,
}

impl Position {
    /// 1.0 when invested, 0.0 when flat.
    pub fn exposure(&self) -> f64 {
        match self {
            Position::Invested => 1.0,
            Position::Flat => 0.0,
        }
    }

    pub fn is_invested(&self) -> bool {
        matches!(self, Position::Invested)
    }
}

/// Per-day position; `None` = unknown.
pub type PositionSeries = Vec<Option<Position>>;

/// Number of leading unknown days.
pub fn leading_unknown(positions: &[Option<Position>]) -> usize {
    positions.iter().take_while(|p| p.is_none()).count()
}
