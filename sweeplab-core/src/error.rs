//! Error taxonomy shared by every layer.
//!
//! Each concrete error type in the workspace maps itself onto one
//! `ErrorCategory`. The sweep runner uses the category to decide whether a
//! failure skips a symbol, skips a combination, or ends the run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Malformed or out-of-domain input. Never retried.
    Validation,
    /// Unresolved values reached a stage that needs fully resolved data.
    DataIntegrity,
    /// A provider or indicator failed for one symbol/parameter pair.
    TransientProvider,
    /// A checkpoint or final write failed.
    Persistence,
    /// A per-combination deadline was exceeded.
    Timeout,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::DataIntegrity => "data_integrity",
            ErrorCategory::TransientProvider => "transient_provider",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Timeout => "timeout",
        }
    }

    /// Only provider failures are scoped to a single symbol; everything else
    /// invalidates the whole combination.
    pub fn skips_symbol_only(&self) -> bool {
        matches!(self, ErrorCategory::TransientProvider)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error type that can surface inside a sweep.
pub trait Categorized {
    fn category(&self) -> ErrorCategory;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_errors_are_symbol_scoped() {
        assert!(ErrorCategory::TransientProvider.skips_symbol_only());
        assert!(!ErrorCategory::Validation.skips_symbol_only());
        assert!(!ErrorCategory::DataIntegrity.skips_symbol_only());
        assert!(!ErrorCategory::Timeout.skips_symbol_only());
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(ErrorCategory::DataIntegrity.to_string(), "data_integrity");
    }
}
