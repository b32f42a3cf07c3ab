//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Population stddev (divide by N). First value at index `period - 1`.

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub lower: Vec<f64>,
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
}

pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let n = closes.len();
    let mut bands = BollingerBands {
        lower: vec![f64::NAN; n],
        middle: vec![f64::NAN; n],
        upper: vec![f64::NAN; n],
    };

    if period == 0 || n < period {
        return bands;
    }

    for i in (period - 1)..n {
        let window = &closes[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|c| (c - mean) * (c - mean))
            .sum::<f64>()
            / period as f64;
        let width = multiplier * variance.sqrt();

        bands.middle[i] = mean;
        bands.upper[i] = mean + width;
        bands.lower[i] = mean - width;
    }

    bands
}
