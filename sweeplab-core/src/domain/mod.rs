//! Domain types: prices, signals, positions, parameter sets, evaluation results.

pub mod evaluation;
pub mod params;
pub mod position;
pub mod price;
pub mod signal;

pub use evaluation::EvaluationResult;
pub use params::ParameterCombination;
pub use position::{leading_unknown, Position, PositionSeries};
pub use price::{PricePoint, PriceSeries, SeriesError};
pub use signal::{IndicatorColumn, IndicatorFrame, SignalMarker, SignalVocabulary};
