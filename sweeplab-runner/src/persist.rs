//! Durable sweep output.
//!
//! - `<run>.csv`: every evaluated combination, ranked, rewritten atomically
//!   (temp file + rename) at each checkpoint
//! - `_summary.csv`: one row per finished run, append-only across runs
//! - `<run>_errors.json`: the error digest, when anything failed

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweeplab_core::domain::{EvaluationResult, ParameterCombination};
use sweeplab_core::error::{Categorized, ErrorCategory};

use crate::results::SweepEntry;

pub const SUMMARY_FILE: &str = "_summary.csv";

const DEFAULT_RETRIES: usize = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write {path} after {attempts} attempts: {source}")]
    Write {
        path: String,
        attempts: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: row {row}: {reason}")]
    Format {
        path: String,
        row: usize,
        reason: String,
    },
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

impl Categorized for PersistError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Persistence
    }
}

// ─── Result rows ─────────────────────────────────────────────────────

const HEADER: [&str; 10] = [
    "rank",
    "s",
    "bah",
    "diff",
    "pct_invested",
    "s_no_fee",
    "trades",
    "symbols",
    "fingerprint",
    "params",
];

#[derive(Debug, Deserialize)]
struct ResultRow {
    #[allow(dead_code)]
    rank: usize,
    s: f64,
    bah: f64,
    diff: f64,
    pct_invested: f64,
    s_no_fee: f64,
    trades: f64,
    symbols: usize,
    fingerprint: String,
    params: String,
}

/// Render ranked entries as CSV, fixed 6-decimal rounding.
pub fn render_results(entries: &[SweepEntry]) -> Result<Vec<u8>, PersistError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;
    for (i, e) in entries.iter().enumerate() {
        let r = &e.result;
        let params = serde_json::to_string(&e.params).unwrap_or_default();
        wtr.write_record([
            &(i + 1).to_string(),
            &format!("{:.6}", r.s),
            &format!("{:.6}", r.bah),
            &format!("{:.6}", r.diff),
            &format!("{:.6}", r.pct_invested),
            &format!("{:.6}", r.s_no_fee),
            &format!("{:.6}", r.trades),
            &e.symbols.to_string(),
            &e.fingerprint,
            &params,
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| PersistError::Csv(csv::Error::from(e.into_error())))
}

/// Writes the ranked result table with bounded retries.
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    retries: usize,
    backoff: Duration,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// `retries` extra attempts, sleeping `backoff * attempt` between them.
    pub fn with_retries(mut self, retries: usize, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the file with `entries` (already ranked).
    pub fn save(&self, entries: &[SweepEntry]) -> Result<(), PersistError> {
        let bytes = render_results(entries)?;
        write_with_retries(&self.path, &bytes, self.retries, self.backoff)?;
        tracing::debug!(
            path = %self.path.display(),
            rows = entries.len(),
            "checkpoint written"
        );
        Ok(())
    }

    /// Read back a persisted table. Metrics carry the persisted rounding.
    pub fn load(&self) -> Result<Vec<SweepEntry>, PersistError> {
        let path = self.path.display().to_string();
        let file = std::fs::File::open(&self.path).map_err(|source| PersistError::Read {
            path: path.clone(),
            source,
        })?;
        let mut rdr = csv::Reader::from_reader(file);
        let mut entries = Vec::new();
        for (i, row) in rdr.deserialize::<ResultRow>().enumerate() {
            let row = row?;
            let params: ParameterCombination =
                serde_json::from_str(&row.params).map_err(|e| PersistError::Format {
                    path: path.clone(),
                    row: i + 1,
                    reason: e.to_string(),
                })?;
            let entry = SweepEntry::new(
                params,
                EvaluationResult {
                    s: row.s,
                    bah: row.bah,
                    diff: row.diff,
                    pct_invested: row.pct_invested,
                    s_no_fee: row.s_no_fee,
                    trades: row.trades,
                },
                row.symbols,
            );
            if entry.fingerprint != row.fingerprint {
                return Err(PersistError::Format {
                    path,
                    row: i + 1,
                    reason: format!(
                        "fingerprint {} does not match parameters ({})",
                        row.fingerprint, entry.fingerprint
                    ),
                });
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

/// Atomic write, retried `retries` extra times with `backoff * attempt` sleeps.
fn write_with_retries(
    path: &Path,
    bytes: &[u8],
    retries: usize,
    backoff: Duration,
) -> Result<(), PersistError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match write_atomic(path, bytes) {
            Ok(()) => return Ok(()),
            Err(source) if attempt > retries => {
                return Err(PersistError::Write {
                    path: path.display().to_string(),
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    "write failed, retrying"
                );
                std::thread::sleep(backoff * attempt as u32);
            }
        }
    }
}

// ─── Rolling summary ─────────────────────────────────────────────────

/// Best row of one run plus run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub run: String,
    pub indicator: String,
    pub selection: String,
    pub started: String,
    pub finished: String,
    pub total_tests: usize,
    pub hours: f64,
    pub secs_per_test: f64,
    pub symbols: String,
    pub grid: String,
    pub sort_by: String,
    pub s: f64,
    pub bah: f64,
    pub diff: f64,
    pub pct_invested: f64,
    pub s_no_fee: f64,
    pub trades: f64,
    pub params: String,
}

fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

impl SummaryRow {
    pub fn rounded(mut self) -> Self {
        for v in [
            &mut self.hours,
            &mut self.secs_per_test,
            &mut self.s,
            &mut self.bah,
            &mut self.diff,
            &mut self.pct_invested,
            &mut self.s_no_fee,
            &mut self.trades,
        ] {
            *v = round6(*v);
        }
        self
    }
}

/// Append one row to `<dir>/_summary.csv` with the default retry policy.
pub fn append_summary(dir: &Path, row: &SummaryRow) -> Result<PathBuf, PersistError> {
    append_summary_with_retries(dir, row, DEFAULT_RETRIES, DEFAULT_BACKOFF)
}

/// Append one row to `<dir>/_summary.csv`, writing the header only for a new
/// file. Existing rows are carried over and the file is replaced atomically,
/// so a failed attempt never leaves a partial row behind.
pub fn append_summary_with_retries(
    dir: &Path,
    row: &SummaryRow,
    retries: usize,
    backoff: Duration,
) -> Result<PathBuf, PersistError> {
    let path = dir.join(SUMMARY_FILE);
    let mut bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(source) => {
            return Err(PersistError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };
    if !bytes.is_empty() && !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(bytes.is_empty())
        .from_writer(vec![]);
    wtr.serialize(row.clone().rounded())?;
    let rendered = wtr
        .into_inner()
        .map_err(|e| PersistError::Csv(csv::Error::from(e.into_error())))?;
    bytes.extend_from_slice(&rendered);

    write_with_retries(&path, &bytes, retries, backoff)?;
    Ok(path)
}

pub fn load_summary(dir: &Path) -> Result<Vec<SummaryRow>, PersistError> {
    let path = dir.join(SUMMARY_FILE);
    let file = std::fs::File::open(&path).map_err(|source| PersistError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut rdr = csv::Reader::from_reader(file);
    rdr.deserialize()
        .collect::<Result<Vec<_>, _>>()
        .map_err(PersistError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(a: f64, s: f64) -> SweepEntry {
        SweepEntry::new(
            ParameterCombination::new().with("a", a).with("b", 0.1),
            EvaluationResult {
                s,
                bah: 1.2,
                diff: s - 1.2,
                pct_invested: 0.25,
                s_no_fee: s + 0.01,
                trades: 4.5,
            },
            2,
        )
    }

    fn summary(run: &str) -> SummaryRow {
        SummaryRow {
            run: run.into(),
            indicator: "rsi".into(),
            selection: "majors".into(),
            started: "2026-01-01T00:00:00Z".into(),
            finished: "2026-01-01T01:00:00Z".into(),
            total_tests: 12,
            hours: 1.0,
            secs_per_test: 300.0,
            symbols: "BTC ETH".into(),
            grid: "{}".into(),
            sort_by: "s".into(),
            s: 1.123_456_789,
            bah: 1.0,
            diff: 0.123_456_789,
            pct_invested: 0.5,
            s_no_fee: 1.2,
            trades: 3.0,
            params: "{\"a\":1.0}".into(),
        }
    }

    #[test]
    fn rows_use_six_decimals_and_rank() {
        let csv = String::from_utf8(render_results(&[entry(1.0, 1.5), entry(2.0, 1.25)]).unwrap())
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].starts_with("1,1.500000,1.200000,0.300000,0.250000,1.510000,4.500000,2,"));
        assert!(lines[2].starts_with("2,1.250000,"));
    }

    #[test]
    fn save_then_load_restores_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("nested").join("run.csv"));
        let entries = vec![entry(1.0, 1.5), entry(2.0, 1.25)];
        store.save(&entries).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].params, entries[0].params);
        assert_eq!(loaded[0].fingerprint, entries[0].fingerprint);
        assert_eq!(loaded[1].result.s, 1.25);
        // no temp file left behind
        assert!(!dir.path().join("nested").join("run.csv.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("run.csv"));
        store.save(&[entry(1.0, 1.0)]).unwrap();
        store.save(&[entry(1.0, 1.0), entry(2.0, 0.9)]).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn unwritable_path_fails_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should go
        let target = dir.path().join("taken");
        std::fs::create_dir(&target).unwrap();
        std::fs::create_dir(dir.path().join("taken.tmp")).unwrap();
        let store = ResultStore::new(&target).with_retries(2, Duration::from_millis(1));
        match store.save(&[entry(1.0, 1.0)]) {
            Err(PersistError::Write { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected write failure, got {other:?}"),
        }
    }

    #[test]
    fn tampered_fingerprint_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("run.csv"));
        store.save(&[entry(1.0, 1.0)]).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        let fp = entry(1.0, 1.0).fingerprint;
        std::fs::write(store.path(), text.replace(&fp, "0000000000000000")).unwrap();
        assert!(matches!(store.load(), Err(PersistError::Format { .. })));
    }

    #[test]
    fn summary_write_retries_then_fails_without_touching_old_rows() {
        let dir = tempfile::tempdir().unwrap();
        append_summary(dir.path(), &summary("first")).unwrap();
        // block the temp file every attempt goes through
        std::fs::create_dir(dir.path().join(format!("{SUMMARY_FILE}.tmp"))).unwrap();

        match append_summary_with_retries(
            dir.path(),
            &summary("second"),
            2,
            Duration::from_millis(1),
        ) {
            Err(PersistError::Write { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected write failure, got {other:?}"),
        }

        let rows = load_summary(dir.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].run, "first");
    }

    #[test]
    fn summary_appends_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        append_summary(dir.path(), &summary("first")).unwrap();
        append_summary(dir.path(), &summary("second")).unwrap();

        let text = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("run,")).count(), 1);

        let rows = load_summary(dir.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].run, "first");
        assert_eq!(rows[1].run, "second");
        assert_eq!(rows[0].s, 1.123457);
    }
}
