use crate::error::{Result, ScreenError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Weights may drift from 1.0 by at most this much.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Weights of the six sub-scores in the composite score.
///
/// ```rust
/// use sift_screen::config::ScoringWeights;
///
/// let weights = ScoringWeights::default();
/// assert!(weights.validate().is_ok());
///
/// let skewed = ScoringWeights { volume: 0.5, ..ScoringWeights::default() };
/// assert!(skewed.validate().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringWeights {
    pub volume: f64,
    pub price_change: f64,
    pub relative_strength: f64,
    pub historical_vol: f64,
    pub options: f64,
    pub short_squeeze: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            volume: 0.20,
            price_change: 0.25,
            relative_strength: 0.20,
            historical_vol: 0.15,
            options: 0.10,
            short_squeeze: 0.10,
        }
    }
}

impl ScoringWeights {
    fn as_array(&self) -> [(&'static str, f64); 6] {
        [
            ("volume", self.volume),
            ("price_change", self.price_change),
            ("relative_strength", self.relative_strength),
            ("historical_vol", self.historical_vol),
            ("options", self.options),
            ("short_squeeze", self.short_squeeze),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().map(|(_, w)| w).sum()
    }

    /// Weights must each be finite and non-negative, and sum to 1.0 (within
    /// [`WEIGHT_SUM_TOLERANCE`]). They are never renormalised.
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.as_array() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ScreenError::Configuration(format!(
                    "weight `{name}` must be a finite, non-negative number, got {weight}"
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScreenError::Configuration(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }

        Ok(())
    }
}

/// Everything a pipeline run needs besides its providers.
#[derive(Clone, Debug)]
pub struct ScreenConfig {
    pub weights: ScoringWeights,

    /// Courtesy delay before each ticker's provider calls.
    pub request_delay: Duration,

    /// Tickers fetched at once; 1 keeps the run strictly sequential.
    pub concurrency: usize,

    /// Keep only the first K tickers of the universe.
    pub limit: Option<usize>,

    /// Symbol whose trailing 20-day return feeds relative strength.
    pub benchmark_symbol: String,

    /// Substituted when the benchmark return cannot be computed.
    pub benchmark_fallback: f64,

    /// Where stage snapshots are written; `None` keeps the run in memory.
    pub snapshot_dir: Option<PathBuf>,

    /// Render progress bars.
    pub tui: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            request_delay: Duration::from_millis(100),
            concurrency: 1,
            limit: None,
            benchmark_symbol: "SPY".to_string(),
            benchmark_fallback: 2.0,
            snapshot_dir: None,
            tui: false,
        }
    }
}

impl ScreenConfig {
    /// Validate before any stage starts.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        if self.concurrency == 0 {
            return Err(ScreenError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.limit == Some(0) {
            return Err(ScreenError::Configuration(
                "limit must be at least 1 when provided".to_string(),
            ));
        }

        if !self.benchmark_fallback.is_finite() {
            return Err(ScreenError::Configuration(format!(
                "benchmark fallback must be finite, got {}",
                self.benchmark_fallback
            )));
        }

        if self.benchmark_symbol.trim().is_empty() {
            return Err(ScreenError::Configuration(
                "benchmark symbol must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
