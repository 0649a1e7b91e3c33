use crate::http::*;
use async_trait::async_trait;
use sift_screen::model::FundamentalRecord;
use sift_screen::provider::FundamentalsProvider;
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

/// Company facts and annual net income.
pub mod facts;

/// Ticker to CIK mapping, buffered on disk.
pub mod tickers;

/// Net income history from the SEC company facts API.
///
/// SEC requires a `USER_AGENT` identifying the caller; see [`crate::sec_client_build`].
pub struct SecFundamentals {
    client: HttpClient,
    buffer_dir: PathBuf,
    ciks: OnceCell<tickers::CikMap>,
}

impl SecFundamentals {
    pub fn new(client: HttpClient, buffer_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            buffer_dir: buffer_dir.into(),
            ciks: OnceCell::new(),
        }
    }

    async fn ciks(&self) -> ProviderResult<&tickers::CikMap> {
        self.ciks
            .get_or_try_init(|| tickers::load(&self.client, &self.buffer_dir))
            .await
    }
}

#[async_trait]
impl FundamentalsProvider for SecFundamentals {
    async fn net_income(&self, ticker: &str) -> ProviderResult<Option<FundamentalRecord>> {
        let cik = self
            .ciks()
            .await?
            .cik(ticker)
            .ok_or_else(|| ProviderError::NotFound(format!("no SEC CIK for {ticker}")))?
            .to_string();
        trace!("[{ticker}] resolved to CIK{cik}");

        let time = std::time::Instant::now();
        let facts: facts::Facts = crate::get_json(&self.client, &facts::url(&cik)).await?;
        debug!(
            "[{ticker}] company facts fetched. {}",
            crate::time_elapsed(time)
        );

        Ok(facts::net_income(&facts))
    }
}
