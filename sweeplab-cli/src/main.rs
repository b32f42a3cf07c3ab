//! SweepLab CLI: parameter sweeps, single evaluations and grid inspection.
//!
//! Commands:
//! - `sweep`: run a full parameter sweep from a TOML config file
//! - `evaluate`: multi-window evaluation of one symbol under one parameter set
//! - `grid`: expand a grid file and report its size
//! - `symbols`: list the symbols available in a CSV data directory

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sweeplab_core::data::{CsvDirectoryProvider, PriceProvider, SyntheticProvider};
use sweeplab_core::domain::ParameterCombination;
use sweeplab_core::engine::{WindowConfig, DEFAULT_FEE};
use sweeplab_core::signals::IndicatorKind;
use sweeplab_runner::{
    evaluate_symbol, load_grid, EvaluationSettings, SweepConfig, SweepOrchestrator, SweepOutcome,
    SweepPhase, SweepProgress,
};

#[derive(Parser)]
#[command(
    name = "sweeplab",
    about = "SweepLab CLI: signal-to-position backtest evaluation and parameter sweeps"
)]
struct Cli {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a parameter sweep from a TOML config file.
    Sweep {
        /// Path to the sweep config.
        #[arg(long)]
        config: PathBuf,

        /// Override worker threads.
        #[arg(long)]
        threads: Option<usize>,

        /// Fixed result file stem (required with --resume).
        #[arg(long)]
        run_name: Option<String>,

        /// Skip combinations already present in the result file.
        #[arg(long, default_value_t = false)]
        resume: bool,

        /// Time this many combinations first and print an estimate.
        #[arg(long)]
        pretest: Option<usize>,
    },
    /// Evaluate one symbol under one parameter set.
    Evaluate {
        /// Indicator: rsi, bb, macd.
        #[arg(long)]
        indicator: IndicatorKind,

        /// Parameter as name=value; repeat per parameter. Missing ones use defaults.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, f64)>,

        #[arg(long)]
        symbol: String,

        /// CSV data directory.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Use a seeded random walk instead of CSV data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 1500)]
        days: usize,

        #[arg(long, default_value_t = 350)]
        window: usize,

        #[arg(long, default_value_t = 100)]
        overlap: usize,

        #[arg(long, default_value_t = DEFAULT_FEE)]
        fee: f64,

        #[arg(long, default_value_t = 600)]
        min_length: usize,

        /// Print the result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Expand `[<indicator>.<variant>]` from a grid file.
    Grid {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        indicator: IndicatorKind,

        #[arg(long, default_value = "default")]
        variant: String,

        /// Print every combination.
        #[arg(long, default_value_t = false)]
        list: bool,
    },
    /// List symbols available in a CSV data directory.
    Symbols {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn parse_param(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for '{name}': {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("sweeplab_core={level},sweeplab_runner={level},sweeplab={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Sweep {
            config,
            threads,
            run_name,
            resume,
            pretest,
        } => run_sweep(&config, threads, run_name, resume, pretest),
        Commands::Evaluate {
            indicator,
            params,
            symbol,
            data_dir,
            synthetic,
            seed,
            days,
            window,
            overlap,
            fee,
            min_length,
            json,
        } => {
            let provider: Box<dyn PriceProvider> = if synthetic {
                Box::new(SyntheticProvider::new(seed, days))
            } else {
                Box::new(CsvDirectoryProvider::new(data_dir))
            };
            let settings = EvaluationSettings {
                window: WindowConfig::new(window, overlap)?,
                fee,
                min_length,
            };
            run_evaluate(indicator, params, &symbol, provider.as_ref(), &settings, json)
        }
        Commands::Grid {
            file,
            indicator,
            variant,
            list,
        } => run_grid(&file, indicator, &variant, list),
        Commands::Symbols { data_dir } => run_symbols(&data_dir),
    }
}

/// Record one interrupt. Returns true when the flag was already raised, i.e.
/// the user pressed Ctrl-C a second time.
fn interrupt(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}

/// First Ctrl-C lets the sweep finish its current combinations and persist;
/// the second one exits at once.
fn install_cancel_handler() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        if interrupt(&handler_flag) {
            eprintln!("\ninterrupted twice, exiting without finalizing");
            std::process::exit(130);
        }
        eprintln!("\ncancelling: finishing in-flight combinations and saving results (Ctrl-C again to abort)");
    })
    .context("failed to install Ctrl-C handler")?;
    Ok(flag)
}

fn run_sweep(
    config_path: &Path,
    threads: Option<usize>,
    run_name: Option<String>,
    resume: bool,
    pretest: Option<usize>,
) -> Result<()> {
    let mut config = SweepConfig::from_file(config_path)?;
    if let Some(t) = threads {
        config.threads = t;
    }
    if run_name.is_some() {
        config.run_name = run_name;
    }
    if resume {
        config.resume = true;
    }
    if let Some(n) = pretest {
        config.pretest = n;
    }
    config.validate()?;
    tracing::info!(
        config = %config_path.display(),
        indicator = %config.indicator,
        threads = config.threads,
        "starting sweep"
    );

    let on_progress = |p: &SweepProgress| {
        if p.phase == SweepPhase::Running {
            let eta = p
                .eta_secs
                .map(|s| format!("{:.0}s", s))
                .unwrap_or_else(|| "-".into());
            eprint!(
                "\r[{}/{}] ok {} skipped {} eta {}   ",
                p.completed, p.total, p.evaluated, p.skipped, eta
            );
        }
    };

    let cancel = install_cancel_handler()?;
    let mut orchestrator = SweepOrchestrator::from_config(config);
    let outcome = orchestrator
        .run(Some(&on_progress), Some(cancel.as_ref()))
        .context("sweep failed")?;
    eprintln!();
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &SweepOutcome) {
    println!("Run: {}", outcome.run_name);
    println!("Symbols: {}", outcome.symbols.join(" "));
    println!(
        "Combinations: {} total, {} evaluated, {} skipped, {} resumed{}",
        outcome.total,
        outcome.evaluated,
        outcome.skipped,
        outcome.resumed,
        if outcome.cancelled { " (cancelled)" } else { "" }
    );
    if let Some(p) = &outcome.pretest {
        println!(
            "Pretest: {:.3}s per combination, estimated {:.2}h",
            p.secs_per_combination,
            p.estimated_total_secs / 3600.0
        );
    }
    println!("Elapsed: {:.1}s", outcome.elapsed_secs);
    println!();
    println!(
        "{:<5} {:>10} {:>10} {:>10} {:>8} {:>8}  Params",
        "Rank", "S", "BaH", "Diff", "Inv%", "Trades"
    );
    println!("{}", "-".repeat(72));
    for (i, e) in outcome.top.iter().enumerate() {
        let r = &e.result;
        println!(
            "{:<5} {:>10.4} {:>10.4} {:>10.4} {:>7.1}% {:>8.1}  {}",
            i + 1,
            r.s,
            r.bah,
            r.diff,
            r.pct_invested * 100.0,
            r.trades,
            e.params
        );
    }
    println!();
    println!("Results: {}", outcome.output_path.display());
    if let Some(path) = &outcome.summary_path {
        println!("Summary: {}", path.display());
    }
    if let Some(path) = &outcome.digest_path {
        println!(
            "Errors:  {} ({} occurrences, {} distinct)",
            path.display(),
            outcome.digest.total,
            outcome.digest.records.len()
        );
    }
}

fn run_evaluate(
    kind: IndicatorKind,
    overrides: Vec<(String, f64)>,
    symbol: &str,
    provider: &dyn PriceProvider,
    settings: &EvaluationSettings,
    json: bool,
) -> Result<()> {
    let mut params: ParameterCombination = kind.default_params();
    for (name, value) in overrides {
        params.insert(name, value);
    }
    let indicator = kind.build(&params)?;
    let prices = provider
        .load(symbol)
        .with_context(|| format!("loading {symbol}"))?;
    let agg = evaluate_symbol(&prices, indicator.as_ref(), settings)?;

    if json {
        let out = serde_json::json!({
            "symbol": symbol,
            "indicator": kind.as_str(),
            "params": params,
            "mean": agg.mean,
            "std": agg.std,
            "windows": agg.windows,
            "evaluated_days": agg.evaluated_days,
            "cut": agg.cut,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {} on {}", indicator.name(), params, symbol);
    println!(
        "Days: {} ({} warm-up dropped), windows: {}",
        agg.evaluated_days, agg.cut, agg.windows
    );
    println!("{:<14} {:>10} {:>10}", "", "mean", "std");
    let rows = [
        ("S", agg.mean.s, agg.std.s),
        ("BaH", agg.mean.bah, agg.std.bah),
        ("Diff", agg.mean.diff, agg.std.diff),
        ("Invested", agg.mean.pct_invested, agg.std.pct_invested),
        ("S (no fee)", agg.mean.s_no_fee, agg.std.s_no_fee),
        ("Trades", agg.mean.trades, agg.std.trades),
    ];
    for (label, mean, std) in rows {
        println!("{label:<14} {mean:>10.4} {std:>10.4}");
    }
    Ok(())
}

fn run_grid(file: &Path, kind: IndicatorKind, variant: &str, list: bool) -> Result<()> {
    let grid = load_grid(file, kind, variant)?;
    grid.check_indicator(kind)?;
    let combinations = grid.combinations()?;

    println!("Grid: {} [{}.{}]", file.display(), kind, variant);
    for (name, values) in grid.expanded()? {
        println!("  {name:<10} {} values", values.len());
    }
    println!("Combinations: {}", combinations.len());
    if list {
        for (i, c) in combinations.iter().enumerate() {
            println!("{:>6}  {}", i + 1, c);
        }
    }
    Ok(())
}

fn run_symbols(data_dir: &Path) -> Result<()> {
    if !data_dir.is_dir() {
        bail!("data directory does not exist: {}", data_dir.display());
    }
    let provider = CsvDirectoryProvider::new(data_dir);
    let symbols = provider.symbols();
    if symbols.is_empty() {
        println!("No symbol files in {}", data_dir.display());
        return Ok(());
    }
    println!("{} symbols in {}", symbols.len(), data_dir.display());
    for s in symbols {
        println!("  {s}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_parsing() {
        assert_eq!(parse_param("length=14").unwrap(), ("length".to_string(), 14.0));
        assert_eq!(parse_param(" std = 2.5").unwrap(), ("std".to_string(), 2.5));
        assert!(parse_param("length").is_err());
        assert!(parse_param("length=abc").is_err());
    }

    #[test]
    fn cli_parses_evaluate() {
        let cli = Cli::try_parse_from([
            "sweeplab",
            "evaluate",
            "--indicator",
            "macd",
            "--param",
            "fast=8",
            "--symbol",
            "BTC",
            "--synthetic",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                indicator, params, ..
            } => {
                assert_eq!(indicator, IndicatorKind::Macd);
                assert_eq!(params, vec![("fast".to_string(), 8.0)]);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn first_interrupt_cancels_second_aborts() {
        let flag = AtomicBool::new(false);
        assert!(!interrupt(&flag));
        assert!(flag.load(Ordering::SeqCst));
        assert!(interrupt(&flag));
    }

    #[test]
    fn cli_parses_sweep_overrides() {
        let cli = Cli::try_parse_from([
            "sweeplab",
            "sweep",
            "--config",
            "configs/sweep.toml",
            "--threads",
            "4",
            "--run-name",
            "rsi_wide",
            "--resume",
        ])
        .unwrap();
        match cli.command {
            Commands::Sweep {
                threads,
                run_name,
                resume,
                ..
            } => {
                assert_eq!(threads, Some(4));
                assert_eq!(run_name.as_deref(), Some("rsi_wide"));
                assert!(resume);
            }
            _ => panic!("expected sweep"),
        }
    }

    #[test]
    fn unknown_indicator_is_rejected() {
        assert!(Cli::try_parse_from(["sweeplab", "grid", "--file", "g.toml", "--indicator", "sma"]).is_err());
    }
}
