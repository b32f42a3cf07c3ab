//! Per-run error collection.
//!
//! Failures below the orchestrator boundary are recorded here with the
//! combination and symbol they occurred for, deduplicated by message text.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sweeplab_core::error::ErrorCategory;

/// Contexts kept per distinct message.
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Display form of the parameter combination.
    pub combination: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub category: ErrorCategory,
    pub count: usize,
    pub samples: Vec<ErrorContext>,
}

/// Deduplicated summary, most frequent message first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDigest {
    pub total: usize,
    pub records: Vec<ErrorRecord>,
}

impl ErrorDigest {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing error digest")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing error digest to {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct ErrorAggregator {
    records: BTreeMap<String, ErrorRecord>,
    total: usize,
    sample_limit: usize,
}

impl Default for ErrorAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_LIMIT)
    }
}

impl ErrorAggregator {
    pub fn new(sample_limit: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            total: 0,
            sample_limit,
        }
    }

    pub fn record(
        &mut self,
        message: impl Into<String>,
        category: ErrorCategory,
        context: ErrorContext,
    ) {
        let message = message.into();
        self.total += 1;
        let record = self
            .records
            .entry(message.clone())
            .or_insert_with(|| ErrorRecord {
                message,
                category,
                count: 0,
                samples: Vec::new(),
            });
        record.count += 1;
        if record.samples.len() < self.sample_limit {
            record.samples.push(context);
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn distinct(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.total = 0;
    }

    pub fn digest(&self) -> ErrorDigest {
        let mut records: Vec<ErrorRecord> = self.records.values().cloned().collect();
        // stable: ties keep message order
        records.sort_by(|a, b| b.count.cmp(&a.count));
        ErrorDigest {
            total: self.total,
            records,
        }
    }

    /// Emit one warning per distinct message.
    pub fn log_digest(&self) {
        if self.is_empty() {
            return;
        }
        tracing::warn!(
            total = self.total,
            distinct = self.distinct(),
            "errors during sweep"
        );
        for r in self.digest().records {
            let first = r.samples.first();
            tracing::warn!(
                count = r.count,
                category = %r.category,
                combination = first.map(|c| c.combination.as_str()).unwrap_or(""),
                symbol = first.and_then(|c| c.symbol.as_deref()).unwrap_or(""),
                "{}",
                r.message
            );
        }
    }
}
