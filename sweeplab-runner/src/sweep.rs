//! Sweep orchestration: grid × symbols → ranked, checkpointed results.
//!
//! Phases: `Init → (Pretest) → Running → Finalizing → Done`. A failing
//! combination is recorded in the run's `ErrorAggregator` and skipped; it
//! never changes the phase. Provider-level failures for one symbol skip only
//! that symbol.
//!
//! With `threads > 1` combinations are evaluated on a rayon pool in
//! checkpoint-sized chunks. The calling thread stays the only writer of the
//! result buffer and the checkpoint file.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweeplab_core::data::PriceProvider;
use sweeplab_core::domain::{EvaluationResult, ParameterCombination, PriceSeries};
use sweeplab_core::error::{Categorized, ErrorCategory};
use sweeplab_core::signals::{IndicatorError, IndicatorKind};

use crate::aggregate::{evaluate_symbol, AggregateError, EvaluationSettings};
use crate::config::{ConfigError, SweepConfig};
use crate::errors::{ErrorAggregator, ErrorContext, ErrorDigest};
use crate::grid::GridError;
use crate::persist::{append_summary_with_retries, PersistError, ResultStore, SummaryRow};
use crate::results::{SweepEntry, SweepResults};

const PERSIST_BACKOFF: Duration = Duration::from_millis(200);

// ─── Errors ──────────────────────────────────────────────────────────

/// Fatal run-level errors. Everything scoped to one combination is recorded
/// in the digest instead.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("no symbol could be loaded")]
    NoSymbols,
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl Categorized for SweepError {
    fn category(&self) -> ErrorCategory {
        match self {
            SweepError::Config(e) => e.category(),
            SweepError::Grid(e) => e.category(),
            SweepError::NoSymbols => ErrorCategory::TransientProvider,
            SweepError::Persist(e) => e.category(),
            SweepError::ThreadPool(_) => ErrorCategory::Validation,
        }
    }
}

/// Why one combination produced no result.
#[derive(Debug, Error, PartialEq)]
pub enum CombinationError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("exceeded the {limit_secs}s per-combination limit")]
    TimedOut { limit_secs: f64 },
    #[error("every symbol was skipped")]
    AllSymbolsSkipped,
}

impl Categorized for CombinationError {
    fn category(&self) -> ErrorCategory {
        match self {
            CombinationError::Indicator(e) => e.category(),
            CombinationError::Aggregate(e) => e.category(),
            CombinationError::TimedOut { .. } => ErrorCategory::Timeout,
            CombinationError::AllSymbolsSkipped => ErrorCategory::TransientProvider,
        }
    }
}

// ─── Progress & outcome types ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepPhase {
    Init,
    Pretest,
    Running,
    Finalizing,
    Done,
}

impl fmt::Display for SweepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SweepPhase::Init => "init",
            SweepPhase::Pretest => "pretest",
            SweepPhase::Running => "running",
            SweepPhase::Finalizing => "finalizing",
            SweepPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Progress update sent after each combination and at phase changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepProgress {
    pub phase: SweepPhase,
    /// Combinations finished, including ones restored on resume.
    pub completed: usize,
    pub total: usize,
    pub evaluated: usize,
    pub skipped: usize,
    pub elapsed_secs: f64,
    pub eta_secs: Option<f64>,
}

/// Timing extrapolated from a short prefix of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PretestEstimate {
    pub combinations: usize,
    pub secs_per_combination: f64,
    pub estimated_total_secs: f64,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub run_name: String,
    /// All entries, ranked by the configured sort field.
    pub entries: Vec<SweepEntry>,
    pub top: Vec<SweepEntry>,
    pub symbols: Vec<String>,
    pub total: usize,
    pub evaluated: usize,
    pub skipped: usize,
    pub resumed: usize,
    pub cancelled: bool,
    pub pretest: Option<PretestEstimate>,
    pub digest: ErrorDigest,
    pub elapsed_secs: f64,
    pub output_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub digest_path: Option<PathBuf>,
}

// ─── Per-combination evaluation ──────────────────────────────────────

/// Result of one combination across all loaded symbols.
#[derive(Debug)]
pub struct CombinationOutcome {
    pub params: ParameterCombination,
    pub result: Result<SweepEntry, (CombinationError, Option<String>)>,
    /// Symbols skipped with a provider-level error.
    pub skipped_symbols: Vec<(String, AggregateError)>,
}

/// Evaluate `params` on every series and average across symbols.
///
/// The deadline is checked after each symbol.
pub fn evaluate_combination(
    kind: IndicatorKind,
    params: &ParameterCombination,
    series: &[PriceSeries],
    settings: &EvaluationSettings,
    timeout: Option<Duration>,
) -> CombinationOutcome {
    let started = Instant::now();
    let mut skipped_symbols = Vec::new();
    let fail = |e: CombinationError, symbol: Option<&str>, skipped| CombinationOutcome {
        params: params.clone(),
        result: Err((e, symbol.map(str::to_string))),
        skipped_symbols: skipped,
    };

    let indicator = match kind.build(params) {
        Ok(i) => i,
        Err(e) => return fail(e.into(), None, skipped_symbols),
    };

    let mut per_symbol: Vec<EvaluationResult> = Vec::with_capacity(series.len());
    for prices in series {
        match evaluate_symbol(prices, indicator.as_ref(), settings) {
            Ok(agg) => per_symbol.push(agg.mean),
            Err(e) if e.category().skips_symbol_only() => {
                skipped_symbols.push((prices.symbol().to_string(), e));
            }
            Err(e) => return fail(e.into(), Some(prices.symbol()), skipped_symbols),
        }
        if let Some(limit) = timeout {
            if started.elapsed() > limit {
                let e = CombinationError::TimedOut {
                    limit_secs: limit.as_secs_f64(),
                };
                return fail(e, Some(prices.symbol()), skipped_symbols);
            }
        }
    }

    match EvaluationResult::mean(&per_symbol) {
        Some(mean) => CombinationOutcome {
            params: params.clone(),
            result: Ok(SweepEntry::new(params.clone(), mean, per_symbol.len())),
            skipped_symbols,
        },
        None => fail(CombinationError::AllSymbolsSkipped, None, skipped_symbols),
    }
}

// ─── Orchestrator ────────────────────────────────────────────────────

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|f| f.load(Ordering::Relaxed))
}

#[derive(Debug, Default)]
struct RunCounters {
    completed: usize,
    evaluated: usize,
    skipped: usize,
}

pub struct SweepOrchestrator {
    config: SweepConfig,
    provider: Box<dyn PriceProvider>,
    errors: ErrorAggregator,
    phase: SweepPhase,
}

impl SweepOrchestrator {
    pub fn new(config: SweepConfig, provider: Box<dyn PriceProvider>) -> Self {
        Self {
            config,
            provider,
            errors: ErrorAggregator::default(),
            phase: SweepPhase::Init,
        }
    }

    /// Build the price provider from the configuration's `[data]` table.
    pub fn from_config(config: SweepConfig) -> Self {
        let provider = config.data.provider();
        Self::new(config, provider)
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    pub fn errors(&self) -> &ErrorAggregator {
        &self.errors
    }

    fn enter(&mut self, phase: SweepPhase) {
        tracing::info!(phase = %phase, "sweep phase");
        self.phase = phase;
    }

    /// Run the full sweep.
    ///
    /// `cancel` is checked before each combination starts, on the pool
    /// workers too. A cancelled run still finalizes and persists everything
    /// completed so far.
    pub fn run(
        &mut self,
        progress_cb: Option<&dyn Fn(&SweepProgress)>,
        cancel: Option<&AtomicBool>,
    ) -> Result<SweepOutcome, SweepError> {
        let start_time = Instant::now();
        let started_at = chrono::Utc::now();
        self.errors.reset();
        self.enter(SweepPhase::Init);
        self.config.validate()?;
        let cfg = self.config.clone();

        // ── Init ──
        let grid = cfg.load_grid()?;
        let combinations = grid.combinations()?;
        let total = combinations.len();

        let courses = cfg.load_courses()?;
        let requested = courses.resolve_available(&cfg.symbols, self.provider.as_ref())?;
        let mut series: Vec<PriceSeries> = Vec::with_capacity(requested.len());
        for symbol in &requested {
            match self.provider.load(symbol) {
                Ok(s) => series.push(s),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "dropping symbol");
                    self.errors.record(
                        e.to_string(),
                        e.category(),
                        ErrorContext {
                            combination: "-".into(),
                            symbol: Some(symbol.clone()),
                        },
                    );
                }
            }
        }
        if series.is_empty() {
            return Err(SweepError::NoSymbols);
        }
        let symbols: Vec<String> = series.iter().map(|s| s.symbol().to_string()).collect();

        let run_name = cfg.run_name.clone().unwrap_or_else(|| {
            format!(
                "{}_{}_{}",
                cfg.indicator,
                cfg.symbols.label(),
                started_at.format("%Y%m%d_%H%M%S")
            )
        });
        let store = ResultStore::new(cfg.output_dir.join(format!("{run_name}.csv")))
            .with_retries(cfg.persist_retries, PERSIST_BACKOFF);

        let mut results = SweepResults::new();
        if cfg.resume && store.exists() {
            results = SweepResults::from_entries(store.load()?);
            tracing::info!(
                restored = results.len(),
                path = %store.path().display(),
                "resuming from checkpoint"
            );
        }
        let resumed = results.len();
        let pending: Vec<ParameterCombination> = combinations
            .into_iter()
            .filter(|p| !results.contains(&p.fingerprint()))
            .collect();

        tracing::info!(
            indicator = %cfg.indicator,
            combinations = total,
            pending = pending.len(),
            symbols = symbols.len(),
            run = %run_name,
            "sweep initialized"
        );

        let settings = cfg.settings();
        let timeout = cfg.timeout_secs.map(Duration::from_secs_f64);
        let evaluate = |p: &ParameterCombination| {
            evaluate_combination(cfg.indicator, p, &series, &settings, timeout)
        };

        // ── Pretest ──
        let mut pretest = None;
        if cfg.pretest > 0 && !pending.is_empty() && !is_cancelled(cancel) {
            self.enter(SweepPhase::Pretest);
            let n = cfg.pretest.min(pending.len());
            let t0 = Instant::now();
            for p in &pending[..n] {
                let _ = evaluate(p);
            }
            let per = t0.elapsed().as_secs_f64() / n as f64;
            let estimate = PretestEstimate {
                combinations: n,
                secs_per_combination: per,
                estimated_total_secs: per * pending.len() as f64 / cfg.threads as f64,
            };
            tracing::info!(
                secs_per_combination = estimate.secs_per_combination,
                estimated_hours = estimate.estimated_total_secs / 3600.0,
                "pretest finished"
            );
            pretest = Some(estimate);
        }

        // ── Running ──
        self.enter(SweepPhase::Running);
        let pool = if cfg.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(cfg.threads)
                    .build()
                    .map_err(|e| SweepError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };

        let mut counters = RunCounters {
            completed: resumed,
            ..Default::default()
        };
        let mut cancelled = false;
        let run_start = Instant::now();

        for chunk in pending.chunks(cfg.checkpoint_every) {
            if is_cancelled(cancel) {
                cancelled = true;
                break;
            }

            match &pool {
                Some(pool) => {
                    // `None` marks a combination never started because of cancellation.
                    let outcomes: Vec<Option<CombinationOutcome>> = pool.install(|| {
                        chunk
                            .par_iter()
                            .map(|p| (!is_cancelled(cancel)).then(|| evaluate(p)))
                            .collect()
                    });
                    let started = outcomes.iter().filter(|o| o.is_some()).count();
                    if started < chunk.len() {
                        cancelled = true;
                    }
                    for outcome in outcomes.into_iter().flatten() {
                        self.absorb(outcome, &mut results, &mut counters, total);
                        report(progress_cb, &counters, total, pending.len(), resumed, &run_start);
                    }
                }
                None => {
                    for p in chunk {
                        if is_cancelled(cancel) {
                            cancelled = true;
                            break;
                        }
                        let outcome = evaluate(p);
                        self.absorb(outcome, &mut results, &mut counters, total);
                        report(progress_cb, &counters, total, pending.len(), resumed, &run_start);
                    }
                }
            }

            store.save(&results.sorted(cfg.sort_by))?;
            if cancelled {
                break;
            }
        }
        if !cancelled && is_cancelled(cancel) && counters.completed < total {
            cancelled = true;
        }
        if cancelled {
            tracing::warn!(completed = counters.completed, total, "sweep cancelled");
        }

        // ── Finalizing ──
        self.enter(SweepPhase::Finalizing);
        let entries = results.sorted(cfg.sort_by);
        store.save(&entries)?;
        let top: Vec<SweepEntry> = entries.iter().take(cfg.top_k).cloned().collect();
        let elapsed = start_time.elapsed().as_secs_f64();

        let summary_path = match entries.first() {
            Some(best) => {
                let row = SummaryRow {
                    run: run_name.clone(),
                    indicator: cfg.indicator.to_string(),
                    selection: cfg.symbols.label(),
                    started: started_at.to_rfc3339(),
                    finished: chrono::Utc::now().to_rfc3339(),
                    total_tests: total,
                    hours: elapsed / 3600.0,
                    secs_per_test: elapsed / counters.evaluated.max(1) as f64,
                    symbols: symbols.join(" "),
                    grid: serde_json::to_string(&grid).unwrap_or_default(),
                    sort_by: cfg.sort_by.to_string(),
                    s: best.result.s,
                    bah: best.result.bah,
                    diff: best.result.diff,
                    pct_invested: best.result.pct_invested,
                    s_no_fee: best.result.s_no_fee,
                    trades: best.result.trades,
                    params: serde_json::to_string(&best.params).unwrap_or_default(),
                };
                Some(append_summary_with_retries(
                    &cfg.output_dir,
                    &row,
                    cfg.persist_retries,
                    PERSIST_BACKOFF,
                )?)
            }
            None => None,
        };

        let digest = self.errors.digest();
        self.errors.log_digest();
        let digest_path = if digest.is_empty() {
            None
        } else {
            let path = cfg.output_dir.join(format!("{run_name}_errors.json"));
            match digest.save_json(&path) {
                Ok(()) => Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "could not write error digest");
                    None
                }
            }
        };

        for (i, e) in top.iter().enumerate() {
            tracing::info!(
                rank = i + 1,
                combination = %e.params,
                s = e.result.s,
                diff = e.result.diff,
                "top result"
            );
        }

        self.enter(SweepPhase::Done);
        if let Some(cb) = progress_cb {
            cb(&SweepProgress {
                phase: SweepPhase::Done,
                completed: counters.completed,
                total,
                evaluated: counters.evaluated,
                skipped: counters.skipped,
                elapsed_secs: elapsed,
                eta_secs: Some(0.0),
            });
        }

        Ok(SweepOutcome {
            run_name,
            entries,
            top,
            symbols,
            total,
            evaluated: counters.evaluated,
            skipped: counters.skipped,
            resumed,
            cancelled,
            pretest,
            digest,
            elapsed_secs: elapsed,
            output_path: store.path().to_path_buf(),
            summary_path,
            digest_path,
        })
    }

    fn absorb(
        &mut self,
        outcome: CombinationOutcome,
        results: &mut SweepResults,
        counters: &mut RunCounters,
        total: usize,
    ) {
        counters.completed += 1;
        let combination = outcome.params.to_string();

        for (symbol, e) in &outcome.skipped_symbols {
            tracing::warn!(combination = %combination, symbol = %symbol, error = %e, "symbol skipped");
            self.errors.record(
                e.to_string(),
                e.category(),
                ErrorContext {
                    combination: combination.clone(),
                    symbol: Some(symbol.clone()),
                },
            );
        }

        match outcome.result {
            Ok(entry) => {
                tracing::info!(
                    index = counters.completed,
                    total,
                    combination = %combination,
                    s = entry.result.s,
                    diff = entry.result.diff,
                    "combination evaluated"
                );
                counters.evaluated += 1;
                results.push(entry);
            }
            Err((e, symbol)) => {
                tracing::warn!(
                    index = counters.completed,
                    total,
                    combination = %combination,
                    symbol = symbol.as_deref().unwrap_or(""),
                    error = %e,
                    "combination skipped"
                );
                counters.skipped += 1;
                self.errors.record(
                    e.to_string(),
                    e.category(),
                    ErrorContext {
                        combination,
                        symbol,
                    },
                );
            }
        }
    }
}

fn report(
    progress_cb: Option<&dyn Fn(&SweepProgress)>,
    counters: &RunCounters,
    total: usize,
    pending: usize,
    resumed: usize,
    run_start: &Instant,
) {
    let Some(cb) = progress_cb else {
        return;
    };
    let elapsed = run_start.elapsed().as_secs_f64();
    let done_now = counters.completed - resumed;
    let eta = (done_now > 0).then(|| elapsed / done_now as f64 * pending.saturating_sub(done_now) as f64);
    cb(&SweepProgress {
        phase: SweepPhase::Running,
        completed: counters.completed,
        total,
        evaluated: counters.evaluated,
        skipped: counters.skipped,
        elapsed_secs: elapsed,
        eta_secs: eta,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{ParamAxis, ParamGrid};
    use chrono::NaiveDate;
    use sweeplab_core::data::InMemoryProvider;

    fn wave(symbol: &str, n: usize, phase: f64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + ((i as f64 + phase) * 0.25).sin() * 12.0 + i as f64 * 0.02)
            .collect();
        PriceSeries::from_closes(symbol, start, &closes).unwrap()
    }

    fn settings() -> EvaluationSettings {
        EvaluationSettings {
            window: sweeplab_core::engine::WindowConfig::new(100, 20).unwrap(),
            fee: 0.004,
            min_length: 200,
        }
    }

    #[test]
    fn combination_averages_across_symbols() {
        let series = vec![wave("A", 500, 0.0), wave("B", 500, 3.0)];
        let params = ParameterCombination::new().with("length", 10.0).with("std", 1.5);
        let out = evaluate_combination(IndicatorKind::Bollinger, &params, &series, &settings(), None);
        let entry = out.result.unwrap();
        assert_eq!(entry.symbols, 2);

        let a = evaluate_combination(IndicatorKind::Bollinger, &params, &series[..1], &settings(), None)
            .result
            .unwrap();
        let b = evaluate_combination(IndicatorKind::Bollinger, &params, &series[1..], &settings(), None)
            .result
            .unwrap();
        assert!((entry.result.s - (a.result.s + b.result.s) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn provider_failure_skips_only_that_symbol() {
        // "TINY" is too short for the indicator to leave warm-up
        let series = vec![wave("A", 500, 0.0), wave("TINY", 5, 0.0)];
        let params = ParameterCombination::new().with("length", 10.0).with("std", 1.5);
        let out = evaluate_combination(IndicatorKind::Bollinger, &params, &series, &settings(), None);
        assert_eq!(out.skipped_symbols.len(), 1);
        assert_eq!(out.skipped_symbols[0].0, "TINY");
        assert_eq!(out.result.unwrap().symbols, 1);
    }

    #[test]
    fn validation_failure_skips_the_combination() {
        // resolved span shorter than min_length
        let series = vec![wave("A", 500, 0.0), wave("SHORT", 150, 0.0)];
        let params = ParameterCombination::new().with("length", 10.0).with("std", 1.5);
        let out = evaluate_combination(IndicatorKind::Bollinger, &params, &series, &settings(), None);
        let (err, symbol) = out.result.unwrap_err();
        assert!(matches!(err, CombinationError::Aggregate(AggregateError::TooShort { .. })));
        assert_eq!(symbol.as_deref(), Some("SHORT"));
    }

    #[test]
    fn bad_parameters_fail_before_evaluation() {
        let series = vec![wave("A", 500, 0.0)];
        let params = ParameterCombination::new().with("length", 0.0).with("std", 1.5);
        let out = evaluate_combination(IndicatorKind::Bollinger, &params, &series, &settings(), None);
        let (err, symbol) = out.result.unwrap_err();
        assert!(matches!(err, CombinationError::Indicator(_)));
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(symbol.is_none());
    }

    #[test]
    fn timeout_fails_the_combination() {
        let series = vec![wave("A", 500, 0.0), wave("B", 500, 1.0)];
        let params = ParameterCombination::new().with("length", 10.0).with("std", 1.5);
        let out = evaluate_combination(
            IndicatorKind::Bollinger,
            &params,
            &series,
            &settings(),
            Some(Duration::from_nanos(1)),
        );
        let (err, _) = out.result.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn missing_symbols_fail_at_init() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig {
            grid: Some(ParamGrid::new()
                .with_axis("length", ParamAxis::Values(vec![10.0]))
                .with_axis("std", ParamAxis::Values(vec![2.0]))),
            indicator: IndicatorKind::Bollinger,
            symbols: crate::config::SymbolSource::List(vec!["NOPE".into()]),
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut orch = SweepOrchestrator::new(config, Box::new(InMemoryProvider::new()));
        let err = orch.run(None, None).unwrap_err();
        assert!(matches!(err, SweepError::Config(ConfigError::MissingSymbols { .. })));
    }

    #[test]
    fn phase_display() {
        assert_eq!(SweepPhase::Finalizing.to_string(), "finalizing");
    }
}
