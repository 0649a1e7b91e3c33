use crate::config::ScreenConfig;
use crate::error::{ProviderError, ScreenError};
use crate::model::{HistoryWindow, MetricBag, OptionChain, PriceBar, TickerMetrics, Universe};
use crate::progress::{Stage, StageProgress, StageSummary};
use crate::provider::MarketDataProvider;
use futures::{stream, StreamExt};
use statrs::statistics::Statistics;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Trading days per year, used to annualise volatility.
pub const TRADING_DAYS: f64 = 252.0;

/// Minimum 1y observations for a volatility estimate (exclusive).
pub const MIN_VOL_OBSERVATIONS: usize = 50;

/// Window of the volume average.
pub const VOLUME_WINDOW: usize = 20;

/// Window of the share volume average the options volume is compared against.
pub const OPTIONS_VOLUME_WINDOW: usize = 5;

// transforms
// ----------------------------------------------------------------------------

/// Round half away from zero to `dp` decimal places.
pub fn round_to(val: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (val * factor).round() / factor
}

/// Annualised standard deviation of daily log returns.
///
/// `None` with 50 bars or fewer, or if the estimate is not finite.
pub fn hist_vol(bars: &[PriceBar]) -> Option<f64> {
    if bars.len() <= MIN_VOL_OBSERVATIONS {
        return None;
    }

    let returns: Vec<f64> = bars
        .windows(2)
        .filter(|pair| pair[0].close > 0.0 && pair[1].close > 0.0)
        .map(|pair| (pair[1].close / pair[0].close).ln())
        .collect();

    let vol = returns.std_dev() * TRADING_DAYS.sqrt();
    vol.is_finite().then(|| round_to(vol, 2))
}

/// Latest volume against the trailing 20-day mean, and that mean.
///
/// Both are `None` with fewer than 20 bars, or if the mean is not positive.
pub fn volume_stats(bars: &[PriceBar]) -> (Option<f64>, Option<f64>) {
    if bars.len() < VOLUME_WINDOW {
        return (None, None);
    }

    let window = &bars[bars.len() - VOLUME_WINDOW..];
    let avg = window.iter().map(|bar| bar.volume).sum::<f64>() / VOLUME_WINDOW as f64;
    if !avg.is_finite() || avg <= 0.0 {
        return (None, None);
    }

    let current = window[VOLUME_WINDOW - 1].volume;
    let ratio = current / avg;
    let ratio = ratio.is_finite().then(|| round_to(ratio, 2));

    (ratio, Some(avg.trunc()))
}

/// Percentage change of the last close against the close `n` bars earlier.
///
/// With fewer than `n + 1` bars the last close is its own reference (no change), as is a
/// non-positive reference close. `None` only when there are no bars at all.
pub fn price_change(bars: &[PriceBar], n: usize) -> Option<f64> {
    let current = bars.last()?.close;
    let reference = if bars.len() > n {
        bars[bars.len() - 1 - n].close
    } else {
        current
    };

    if reference > 0.0 {
        let change = (current - reference) / reference * 100.0;
        Some(if change.is_finite() { round_to(change, 2) } else { 0.0 })
    } else {
        Some(0.0)
    }
}

/// Options volume relative to share volume, and puts relative to calls.
///
/// A chain without any traded volume gives the neutral pair `(0, 1)`.
pub fn options_activity(chain: &OptionChain, recent: &[PriceBar]) -> (Option<f64>, Option<f64>) {
    let calls = chain.call_volume();
    let puts = chain.put_volume();
    let total = calls + puts;

    let window = &recent[recent.len().saturating_sub(OPTIONS_VOLUME_WINDOW)..];
    let avg_stock_volume = if window.is_empty() {
        1.0
    } else {
        window.iter().map(|bar| bar.volume).sum::<f64>() / window.len() as f64
    };

    if total > 0.0 {
        (
            Some(round_to(total / avg_stock_volume.max(1.0), 4)),
            Some(round_to(puts / calls.max(1.0), 4)),
        )
    } else {
        (Some(0.0), Some(1.0))
    }
}

// collection
// ----------------------------------------------------------------------------

// every provider call waits out the courtesy delay first
async fn courteous<T, F>(delay: Duration, call: F) -> T
where
    F: Future<Output = T>,
{
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    call.await
}

/// Collect the metric bag of one ticker; any failure degrades the bag to all-missing.
pub async fn collect_one(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    delay: Duration,
) -> TickerMetrics {
    match try_collect(provider, ticker, delay).await {
        Ok(bag) => TickerMetrics::collected(ticker, bag),
        Err(err) => {
            let err = ScreenError::per_ticker(ticker, err);
            error!("failed to collect screening metrics, {err}");
            TickerMetrics::missing(ticker, err.to_string())
        }
    }
}

async fn try_collect(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    delay: Duration,
) -> Result<MetricBag, ProviderError> {
    let hist_1y = courteous(delay, provider.history(ticker, HistoryWindow::OneYear)).await?;
    let hist_30d = courteous(delay, provider.history(ticker, HistoryWindow::ThirtyDays)).await?;
    let info = courteous(delay, provider.info(ticker)).await?;
    trace!(
        "[{ticker}] {} 1y bars, {} 30d bars",
        hist_1y.len(),
        hist_30d.len()
    );

    let (volume_ratio, avg_volume_20d) = volume_stats(&hist_30d);
    let (options_proxy, put_call_proxy) = options_metrics(provider, ticker, &hist_30d, delay).await;

    Ok(MetricBag {
        hist_vol_1y: hist_vol(&hist_1y),
        volume_ratio,
        avg_volume_20d,
        change_1d: price_change(&hist_30d, 1),
        change_5d: price_change(&hist_30d, 5),
        change_20d: price_change(&hist_30d, 20),
        options_proxy,
        put_call_proxy,
        // absent short interest means "not shorted"
        short_ratio: Some(round_to(info.short_ratio.unwrap_or(0.0), 2)),
        short_percent: Some(round_to(info.short_percent_of_float.unwrap_or(0.0), 2)),
    })
}

// Options failures stay local: both proxies go missing, the rest of the bag survives.
async fn options_metrics(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    recent: &[PriceBar],
    delay: Duration,
) -> (Option<f64>, Option<f64>) {
    let expiry = match courteous(delay, provider.option_expiries(ticker)).await {
        Ok(expiries) => match expiries.into_iter().next() {
            Some(expiry) => expiry,
            None => {
                debug!("[{ticker}] no option expiries available");
                return (None, None);
            }
        },
        Err(err) => {
            warn!("[{ticker}] failed to fetch option expiries, error({err})");
            return (None, None);
        }
    };

    match courteous(delay, provider.option_chain(ticker, expiry)).await {
        Ok(chain) => options_activity(&chain, recent),
        Err(err) => {
            warn!("[{ticker}] failed to fetch option chain for {expiry}, error({err})");
            (None, None)
        }
    }
}

/// Collect metric bags for every ticker of `universe`, in order, one row per ticker.
pub async fn collect(
    provider: &dyn MarketDataProvider,
    universe: &Universe,
    config: &ScreenConfig,
) -> (Vec<TickerMetrics>, StageSummary) {
    info!("collecting screening metrics for {} tickers ...", universe.len());
    let progress = StageProgress::new(Stage::Metrics, universe.len(), config.tui);

    let rows: Vec<TickerMetrics> = stream::iter(universe.iter())
        .map(|ticker| {
            let progress = &progress;
            async move {
                let spinner =
                    progress.spinner(format!("collecting screening metrics for [{ticker}]"));
                let row = collect_one(provider, ticker, config.request_delay).await;
                spinner.finish_and_clear();

                if row.is_collected() {
                    trace!("[{ticker}] screening metrics collected");
                    progress.success();
                } else {
                    progress.failure();
                }
                row
            }
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    (rows, progress.finish())
}
