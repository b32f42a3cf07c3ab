//! SweepLab Runner: parameter sweeps over the evaluation engine.
//!
//! This crate builds on `sweeplab-core` to provide:
//! - Parameter grid expansion (explicit lists and `start/end/step` ranges)
//! - TOML configuration: sweep settings, grid files, course selections
//! - Multi-window aggregation per (symbol, combination)
//! - The sweep orchestrator with pretest, checkpointing, resume,
//!   cancellation, per-combination timeout and a rayon worker pool
//! - Result persistence (ranked CSV, rolling summary) and the error digest

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod grid;
pub mod persist;
pub mod results;
pub mod sweep;

pub use aggregate::{evaluate_symbol, AggregateError, AggregatedEvaluation, EvaluationSettings};
pub use config::{
    load_grid, ConfigError, CourseSelection, DataConfig, SortField, SweepConfig, SymbolSource,
};
pub use errors::{ErrorAggregator, ErrorContext, ErrorDigest, ErrorRecord};
pub use grid::{GridError, ParamAxis, ParamGrid, MAX_AXIS_VALUES, MAX_COMBINATIONS};
pub use persist::{
    append_summary, append_summary_with_retries, load_summary, PersistError, ResultStore,
    SummaryRow,
};
pub use results::{SweepEntry, SweepResults};
pub use sweep::{
    evaluate_combination, CombinationError, CombinationOutcome, PretestEstimate, SweepError,
    SweepOrchestrator, SweepOutcome, SweepPhase, SweepProgress,
};
