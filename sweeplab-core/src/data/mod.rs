//! Price providers and structured error types.
//!
//! The `PriceProvider` trait abstracts over where daily closes come from
//! (CSV files on disk, a seeded synthetic generator, an in-memory map for
//! tests) so the sweep runner never cares.

pub mod csv_dir;
pub mod memory;
pub mod synthetic;

pub use csv_dir::CsvDirectoryProvider;
pub use memory::InMemoryProvider;
pub use synthetic::SyntheticProvider;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{PriceSeries, SeriesError};
use crate::error::{Categorized, ErrorCategory};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("{symbol}: failed to read {path}: {source}")]
    Io {
        symbol: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{symbol}: malformed CSV row {row}: {reason}")]
    Parse {
        symbol: String,
        row: usize,
        reason: String,
    },

    #[error("{symbol}: no price rows")]
    Empty { symbol: String },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

impl Categorized for DataError {
    fn category(&self) -> ErrorCategory {
        match self {
            DataError::Series(_) => ErrorCategory::Validation,
            _ => ErrorCategory::TransientProvider,
        }
    }
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Csv,
    Synthetic,
    Memory,
}

/// Source of daily close series keyed by symbol.
pub trait PriceProvider: Send + Sync {
    fn source(&self) -> DataSource;

    /// Whether `load(symbol)` can be expected to succeed.
    fn contains(&self, symbol: &str) -> bool;

    fn load(&self, symbol: &str) -> Result<PriceSeries, DataError>;

    /// Symbols this provider knows about, sorted. Generators that accept any
    /// symbol return an empty list.
    fn symbols(&self) -> Vec<String> {
        Vec::new()
    }
}
