//! Fixed map of pre-built series.

use std::collections::BTreeMap;

use crate::domain::PriceSeries;

use super::{DataError, DataSource, PriceProvider};

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: BTreeMap<String, PriceSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }
}

impl PriceProvider for InMemoryProvider {
    fn source(&self) -> DataSource {
        DataSource::Memory
    }

    fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    fn load(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn symbols(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }
}
