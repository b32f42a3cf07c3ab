//! In-memory sweep results and ranking.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use sweeplab_core::domain::{EvaluationResult, ParameterCombination};

use crate::config::SortField;

/// One evaluated combination, averaged across symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub params: ParameterCombination,
    pub result: EvaluationResult,
    /// Symbols that contributed to the average.
    pub symbols: usize,
    pub fingerprint: String,
}

impl SweepEntry {
    pub fn new(params: ParameterCombination, result: EvaluationResult, symbols: usize) -> Self {
        let fingerprint = params.fingerprint();
        Self {
            params,
            result,
            symbols,
            fingerprint,
        }
    }
}

/// Descending by `field`; NaN ranks last; ties keep insertion order.
pub fn rank(entries: &mut [SweepEntry], field: SortField) {
    let key = |e: &SweepEntry| {
        let v = field.extract(&e.result);
        if v.is_nan() {
            f64::NEG_INFINITY
        } else {
            v
        }
    };
    entries.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Append-only buffer owned by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
    fingerprints: HashSet<String>,
}

impl SweepResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previously persisted run.
    pub fn from_entries(entries: Vec<SweepEntry>) -> Self {
        let mut results = Self::new();
        for e in entries {
            results.push(e);
        }
        results
    }

    /// Returns false when the fingerprint is already present.
    pub fn push(&mut self, entry: SweepEntry) -> bool {
        if !self.fingerprints.insert(entry.fingerprint.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    pub fn all(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sorted(&self, field: SortField) -> Vec<SweepEntry> {
        let mut sorted = self.entries.clone();
        rank(&mut sorted, field);
        sorted
    }

    pub fn top_n(&self, field: SortField, n: usize) -> Vec<SweepEntry> {
        let mut sorted = self.sorted(field);
        sorted.truncate(n);
        sorted
    }

    pub fn best(&self, field: SortField) -> Option<SweepEntry> {
        self.top_n(field, 1).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(a: f64, s: f64, diff: f64) -> SweepEntry {
        SweepEntry::new(
            ParameterCombination::new().with("a", a),
            EvaluationResult {
                s,
                bah: s - diff,
                diff,
                pct_invested: 0.5,
                s_no_fee: s,
                trades: 1.0,
            },
            1,
        )
    }

    #[test]
    fn sorts_descending_by_field() {
        let results =
            SweepResults::from_entries(vec![entry(1.0, 1.1, 0.3), entry(2.0, 1.5, -0.1), entry(3.0, 1.3, 0.0)]);
        let by_s: Vec<f64> = results.sorted(SortField::S).iter().map(|e| e.result.s).collect();
        assert_eq!(by_s, vec![1.5, 1.3, 1.1]);

        let best_diff = results.best(SortField::Diff).unwrap();
        assert_eq!(best_diff.params.get("a"), Some(1.0));
        assert_eq!(results.top_n(SortField::S, 2).len(), 2);
    }

    #[test]
    fn nan_ranks_last() {
        let results = SweepResults::from_entries(vec![entry(1.0, f64::NAN, 0.0), entry(2.0, 0.9, 0.0)]);
        let sorted = results.sorted(SortField::S);
        assert_eq!(sorted[0].params.get("a"), Some(2.0));
    }

    #[test]
    fn duplicate_fingerprints_are_ignored() {
        let mut results = SweepResults::new();
        assert!(results.push(entry(1.0, 1.0, 0.0)));
        assert!(!results.push(entry(1.0, 2.0, 0.0)));
        assert_eq!(results.len(), 1);
        assert!(results.contains(&ParameterCombination::new().with("a", 1.0).fingerprint()));
    }
}
