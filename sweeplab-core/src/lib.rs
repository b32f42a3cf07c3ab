//! SweepLab Core: signal-to-position evaluation engine.
//!
//! This crate contains everything needed to score one parameter set on one
//! symbol:
//! - Domain types (price series, signal markers, positions, evaluation results)
//! - Overlapping window splitting
//! - Lookahead-safe position derivation with strict warm-up handling
//! - Fee-aware compounding returns against a buy-and-hold benchmark
//! - Indicator math and the RSI / Bollinger / MACD signal handlers
//! - Price providers (CSV directory, synthetic, in-memory)
//! - The error taxonomy shared by the whole workspace

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod signals;

pub use error::{Categorized, ErrorCategory};
