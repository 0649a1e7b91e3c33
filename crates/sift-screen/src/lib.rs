//! Four-stage equity screen.
//!
//! 1. [`universe`]: listing source to ordered, de-duplicated tickers.
//! 2. [`fundamentals`]: keep tickers with three years of positive, non-decreasing net income.
//! 3. [`metrics`]: price, volume, options and short interest metrics per surviving ticker.
//! 4. [`scoring`]: cross-sectional percentiles, weighted into a composite and ranked.
//!
//! Data access sits behind the traits of [`provider`]; [`pipeline`] wires the stages together.
pub mod config;
pub mod error;
pub mod fundamentals;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod scoring;
pub mod snapshot;
pub mod universe;

pub use config::{ScoringWeights, ScreenConfig};
pub use error::{ProviderError, ScreenError};
pub use pipeline::{Pipeline, PipelineReport};
