//! Interfaces to the external data sources the pipeline consumes.
//!
//! The pipeline is agnostic to transport; `sift-spider` implements these over HTTP, and the
//! tests implement them in memory.

use crate::error::ProviderError;
use crate::model::{
    FundamentalRecord, HistoryWindow, InfoSnapshot, Listing, OptionChain, PriceBar,
};
use async_trait::async_trait;
use chrono::NaiveDate;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A table of symbols and company metadata.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    async fn listing(&self) -> ProviderResult<Listing>;
}

/// Annual net income history per ticker.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Returns `Ok(None)` when the ticker has no net income line item.
    async fn net_income(&self, ticker: &str) -> ProviderResult<Option<FundamentalRecord>>;
}

/// Daily prices, descriptive fields and option chains per ticker.
///
/// The benchmark return is computed from [`MarketDataProvider::history`] of the benchmark
/// symbol.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars ordered oldest → newest.
    async fn history(&self, ticker: &str, window: HistoryWindow) -> ProviderResult<Vec<PriceBar>>;

    async fn info(&self, ticker: &str) -> ProviderResult<InfoSnapshot>;

    /// Available option expiries, nearest first.
    async fn option_expiries(&self, ticker: &str) -> ProviderResult<Vec<NaiveDate>>;

    async fn option_chain(&self, ticker: &str, expiry: NaiveDate) -> ProviderResult<OptionChain>;
}
