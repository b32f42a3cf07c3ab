//! Daily close-price series for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Categorized, ErrorCategory};

/// One daily observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Errors raised while constructing a `PriceSeries`.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("{symbol}: date {date} at index {index} is not after the previous date")]
    NotIncreasing {
        symbol: String,
        index: usize,
        date: NaiveDate,
    },
    #[error("{symbol}: close at index {index} must be finite and positive, got {value}")]
    InvalidClose {
        symbol: String,
        index: usize,
        value: f64,
    },
}

impl Categorized for SeriesError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// Strictly increasing, duplicate-free daily close prices.
///
/// Immutable once built: the only way in is `new`, which validates ordering
/// and prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(SeriesError::InvalidClose {
                    symbol,
                    index: i,
                    value: p.close,
                });
            }
            if i > 0 && p.date <= points[i - 1].date {
                return Err(SeriesError::NotIncreasing {
                    symbol,
                    index: i,
                    date: p.date,
                });
            }
        }
        Ok(Self { symbol, points })
    }

    /// Build a series of consecutive calendar days starting at `start`.
    pub fn from_closes(
        symbol: impl Into<String>,
        start: NaiveDate,
        closes: &[f64],
    ) -> Result<Self, SeriesError> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close,
            })
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Truncated copy holding the first `len` points. Used to check that
    /// indicators never read ahead.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self.points[..len.min(self.points.len())].to_vec(),
        }
    }
}
