//! One `<SYMBOL>.csv` per symbol with at least `date` and `close` columns.
//!
//! Extra columns (open, high, volume, ...) are ignored. Dates may be plain
//! `YYYY-MM-DD` or carry a time suffix, which is dropped. Rows are sorted by
//! date after loading; duplicates are rejected by `PriceSeries::new`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{PricePoint, PriceSeries};

use super::{DataError, DataSource, PriceProvider};

#[derive(Debug, Deserialize)]
struct Row {
    date: String,
    close: f64,
}

#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl PriceProvider for CsvDirectoryProvider {
    fn source(&self) -> DataSource {
        DataSource::Csv
    }

    fn contains(&self, symbol: &str) -> bool {
        self.path_for(symbol).is_file()
    }

    fn load(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| DataError::Io {
            symbol: symbol.to_string(),
            path: path.display().to_string(),
            source: std::io::Error::from(e),
        })?;

        let mut points = Vec::new();
        for (i, record) in reader.deserialize::<Row>().enumerate() {
            let row = record.map_err(|e| DataError::Parse {
                symbol: symbol.to_string(),
                row: i + 1,
                reason: e.to_string(),
            })?;
            let date = parse_date(&row.date).ok_or_else(|| DataError::Parse {
                symbol: symbol.to_string(),
                row: i + 1,
                reason: format!("unparseable date '{}'", row.date),
            })?;
            points.push(PricePoint {
                date,
                close: row.close,
            });
        }

        if points.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
            });
        }
        points.sort_by_key(|p| p.date);
        tracing::debug!(symbol, rows = points.len(), path = %path.display(), "loaded price csv");
        Ok(PriceSeries::new(symbol, points)?)
    }

    fn symbols(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|e| {
                let path = e.path();
                if path.extension()? != "csv" {
                    return None;
                }
                path.file_stem()?.to_str().map(str::to_string)
            })
            .filter(|s| !s.starts_with('_'))
            .collect();
        symbols.sort();
        symbols
    }
}
