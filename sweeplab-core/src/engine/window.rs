//! Overlapping fixed-length evaluation windows.
//!
//! Windows start at 0 and advance by `length - overlap`. A window is kept
//! while it fits entirely inside the series (`start + length <= n`), so a
//! series of exactly `length` samples yields one window. A series shorter
//! than `length` yields a single window covering all of it.

use serde::{Deserialize, Serialize};

use super::EngineError;

// ─── Configuration ───────────────────────────────────────────────────

/// Window geometry in samples (trading days).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Samples per window (default 350).
    pub length: usize,
    /// Samples shared by consecutive windows (default 100).
    pub overlap: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length: 350,
            overlap: 100,
        }
    }
}

impl WindowConfig {
    pub fn new(length: usize, overlap: usize) -> Result<Self, EngineError> {
        let cfg = Self { length, overlap };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.length == 0 {
            return Err(EngineError::ZeroWindowLength);
        }
        if self.overlap >= self.length {
            return Err(EngineError::OverlapTooLarge {
                overlap: self.overlap,
                length: self.length,
            });
        }
        Ok(())
    }

    pub fn step(&self) -> usize {
        self.length - self.overlap
    }
}

// ─── Windows ─────────────────────────────────────────────────────────

/// Half-open index range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Split `n` samples into overlapping windows.
pub fn split_windows(n: usize, config: &WindowConfig) -> Result<Vec<Window>, EngineError> {
    config.validate()?;

    if n == 0 {
        return Ok(Vec::new());
    }
    if n < config.length {
        return Ok(vec![Window { start: 0, end: n }]);
    }

    let step = config.step();
    let mut windows = Vec::with_capacity((n - config.length) / step + 1);
    let mut start = 0;
    while start + config.length <= n {
        windows.push(Window {
            start,
            end: start + config.length,
        });
        start += step;
    }
    Ok(windows)
}
