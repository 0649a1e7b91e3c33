use crate::http::*;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sift_screen::model::{
    HistoryWindow, InfoSnapshot, OptionChain, OptionContract, PriceBar,
};
use sift_screen::provider::MarketDataProvider;
use tokio::sync::OnceCell;
use tracing::{debug, error, trace};

const QUERY_URL: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";

/// Daily bars, key statistics and option chains from Yahoo Finance.
///
/// The quote summary and options endpoints want a session cookie and its crumb; the handshake
/// runs on first use and the crumb is reused for the life of the provider.
pub struct YahooFinance {
    client: HttpClient,
    crumb: OnceCell<String>,
}

impl YahooFinance {
    /// `client` must keep cookies; see [`crate::std_client_build`].
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            crumb: OnceCell::new(),
        }
    }

    async fn crumb(&self) -> ProviderResult<&str> {
        self.crumb
            .get_or_try_init(|| async {
                // sets the session cookie; the response itself is usually a 404
                trace!("fetching Yahoo Finance session cookie");
                let _ = self.client.get(COOKIE_URL).send().await;

                let url = format!("{QUERY_URL}/v1/test/getcrumb");
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|err| ProviderError::Request(err.to_string()))?;
                if !response.status().is_success() {
                    return Err(ProviderError::Status {
                        status: response.status().as_u16(),
                        url,
                    });
                }

                let crumb = response
                    .text()
                    .await
                    .map_err(|err| ProviderError::Parse(err.to_string()))?;
                if crumb.trim().is_empty() || crumb.contains('<') {
                    error!("Yahoo Finance returned an invalid crumb");
                    return Err(ProviderError::Unavailable("invalid crumb".to_string()));
                }
                debug!("Yahoo Finance crumb acquired");
                Ok::<_, ProviderError>(crumb.trim().to_string())
            })
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinance {
    async fn history(&self, ticker: &str, window: HistoryWindow) -> ProviderResult<Vec<PriceBar>> {
        let symbol = symbol(ticker);
        let period2 = Utc::now().timestamp();
        let period1 = period2 - window.calendar_days() * 24 * 60 * 60;
        let url = format!(
            "{QUERY_URL}/v8/finance/chart/{symbol}?period1={period1}&period2={period2}&interval=1d"
        );

        let response: PriceResponse = crate::get_json(&self.client, &url).await?;
        let bars = window_prices(response, window)?;
        trace!("[{ticker}] {} daily bars", bars.len());
        Ok(bars)
    }

    async fn info(&self, ticker: &str) -> ProviderResult<InfoSnapshot> {
        let symbol = symbol(ticker);
        let crumb = self.crumb().await?;
        let url = format!(
            "{QUERY_URL}/v10/finance/quoteSummary/{symbol}?modules=defaultKeyStatistics&crumb={crumb}"
        );

        let response: SummaryResponse = crate::get_json(&self.client, &url).await?;
        key_statistics(response)
    }

    async fn option_expiries(&self, ticker: &str) -> ProviderResult<Vec<NaiveDate>> {
        let symbol = symbol(ticker);
        let crumb = self.crumb().await?;
        let url = format!("{QUERY_URL}/v7/finance/options/{symbol}?crumb={crumb}");

        let response: OptionsResponse = crate::get_json(&self.client, &url).await?;
        expiries(response)
    }

    async fn option_chain(&self, ticker: &str, expiry: NaiveDate) -> ProviderResult<OptionChain> {
        let symbol = symbol(ticker);
        let crumb = self.crumb().await?;
        let date = expiry
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| ProviderError::Parse(format!("invalid expiry {expiry}")))?;
        let url = format!("{QUERY_URL}/v7/finance/options/{symbol}?date={date}&crumb={crumb}");

        let response: OptionsResponse = crate::get_json(&self.client, &url).await?;
        chain(response)
    }
}

// transform
// ----------------------------------------------------------------------------

/// Yahoo Finance files share classes with a dash: `BRK.B` is `BRK-B`.
pub fn symbol(ticker: &str) -> String {
    ticker.trim().to_uppercase().replace('.', "-")
}

fn timestamp_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Daily bars, oldest first; bars without a close are skipped.
pub fn prices(response: PriceResponse) -> ProviderResult<Vec<PriceBar>> {
    let base = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| {
            ProviderError::NotFound(
                response
                    .chart
                    .error
                    .map(|err| err.description)
                    .unwrap_or_else(|| "no results found within http response".to_string()),
            )
        })?;

    let Some(quote) = base.indicators.quote.into_iter().next() else {
        return Ok(vec![]);
    };

    let bars = base
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, timestamp)| {
            let close = quote.close.get(i).copied().flatten()?;
            let at = |values: &Vec<Option<f64>>| values.get(i).copied().flatten();
            Some(PriceBar {
                date: timestamp_date(*timestamp)?,
                open: at(&quote.open).unwrap_or(close),
                high: at(&quote.high).unwrap_or(close),
                low: at(&quote.low).unwrap_or(close),
                close,
                volume: at(&quote.volume).unwrap_or(0.0),
            })
        })
        .collect();

    Ok(bars)
}

/// Daily bars cut to the trailing bars `window` keeps.
pub fn window_prices(
    response: PriceResponse,
    window: HistoryWindow,
) -> ProviderResult<Vec<PriceBar>> {
    prices(response).map(|bars| window.trim(bars))
}

pub fn key_statistics(response: SummaryResponse) -> ProviderResult<InfoSnapshot> {
    let stats = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.default_key_statistics)
        .ok_or_else(|| {
            ProviderError::NotFound(
                response
                    .quote_summary
                    .error
                    .map(|err| err.description)
                    .unwrap_or_else(|| "no key statistics".to_string()),
            )
        })?;

    Ok(InfoSnapshot {
        shares_outstanding: stats.shares_outstanding.raw,
        float_shares: stats.float_shares.raw,
        short_ratio: stats.short_ratio.raw,
        short_percent_of_float: stats.short_percent_of_float.raw,
    })
}

/// Option expiries, nearest first.
pub fn expiries(response: OptionsResponse) -> ProviderResult<Vec<NaiveDate>> {
    let result = first_option_result(response)?;
    let mut dates: Vec<NaiveDate> = result
        .expiration_dates
        .into_iter()
        .filter_map(timestamp_date)
        .collect();
    dates.sort();
    Ok(dates)
}

pub fn chain(response: OptionsResponse) -> ProviderResult<OptionChain> {
    let result = first_option_result(response)?;
    let Some(options) = result.options.into_iter().next() else {
        return Ok(OptionChain::default());
    };

    let contracts = |contracts: Vec<Contract>| {
        contracts
            .into_iter()
            .map(|c| OptionContract {
                contract: c.contract_symbol,
                strike: c.strike,
                volume: c.volume,
            })
            .collect()
    };

    Ok(OptionChain {
        expiry: options.expiration_date.and_then(timestamp_date),
        calls: contracts(options.calls),
        puts: contracts(options.puts),
    })
}

fn first_option_result(response: OptionsResponse) -> ProviderResult<OptionResult> {
    let error = response.option_chain.error;
    response
        .option_chain
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| {
            ProviderError::NotFound(
                error
                    .map(|err| err.description)
                    .unwrap_or_else(|| "no option chain".to_string()),
            )
        })
}

// de
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    description: String,
}

// chart
#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

// quote summary
#[derive(Debug, Deserialize)]
pub struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<SummaryResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct KeyStatistics {
    shares_outstanding: Raw,
    float_shares: Raw,
    short_ratio: Raw,
    short_percent_of_float: Raw,
}

// `{"raw": 0.0071, "fmt": "0.71%"}`, or `{}` when not reported
#[derive(Debug, Default, Deserialize)]
struct Raw {
    #[serde(default)]
    raw: Option<f64>,
}

// options
#[derive(Debug, Deserialize)]
pub struct OptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: OptionChainEnvelope,
}

#[derive(Debug, Deserialize)]
struct OptionChainEnvelope {
    result: Option<Vec<OptionResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionResult {
    #[serde(default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<Options>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Options {
    expiration_date: Option<i64>,
    #[serde(default)]
    calls: Vec<Contract>,
    #[serde(default)]
    puts: Vec<Contract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contract {
    contract_symbol: String,
    strike: f64,
    volume: Option<f64>,
}
