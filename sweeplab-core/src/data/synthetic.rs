//! Seeded random-walk prices for development and benchmarks.
//!
//! Each symbol gets its own sub-seed derived from the master seed via
//! BLAKE3, so a symbol's series does not depend on which other symbols are
//! requested or in what order. Results on synthetic data are tagged through
//! `DataSource::Synthetic`.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::PriceSeries;

use super::{DataError, DataSource, PriceProvider};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    days: usize,
    start: NaiveDate,
    /// Daily volatility of the log-ish random walk.
    volatility: f64,
}

impl SyntheticProvider {
    pub fn new(seed: u64, days: usize) -> Self {
        Self {
            seed,
            days,
            start: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default(),
            volatility: 0.03,
        }
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = start;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    fn sub_seed(&self, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Deterministic close path for `symbol`.
    pub fn closes(&self, symbol: &str) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.sub_seed(symbol));
        let mut price = rng.gen_range(20.0..200.0);
        (0..self.days)
            .map(|_| {
                let shock: f64 = rng.gen_range(-1.0..1.0);
                price *= 1.0 + 0.0003 + self.volatility * shock;
                price = price.max(0.01);
                price
            })
            .collect()
    }
}

impl PriceProvider for SyntheticProvider {
    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn contains(&self, _symbol: &str) -> bool {
        true
    }

    fn load(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        if self.days == 0 {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
            });
        }
        tracing::warn!(symbol, days = self.days, "generating synthetic prices");
        Ok(PriceSeries::from_closes(
            symbol,
            self.start,
            &self.closes(symbol),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_series() {
        let a = SyntheticProvider::new(42, 300).load("BTC").unwrap();
        let b = SyntheticProvider::new(42, 300).load("BTC").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 300);
    }

    #[test]
    fn symbols_get_independent_paths() {
        let p = SyntheticProvider::new(42, 50);
        assert_ne!(p.closes("BTC"), p.closes("ETH"));
    }

    #[test]
    fn prices_stay_positive() {
        let p = SyntheticProvider::new(7, 2000).with_volatility(0.2);
        assert!(p.closes("X").iter().all(|&c| c > 0.0));
    }

    #[test]
    fn zero_days_is_empty_error() {
        assert!(SyntheticProvider::new(1, 0).load("X").is_err());
    }
}
