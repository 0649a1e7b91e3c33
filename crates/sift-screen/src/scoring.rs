//! Cross-sectional percentile scoring.
//!
//! Each raw metric column is ranked across the whole snapshot (missing values imputed for
//! ranking only), sub-scores are blended from those percentiles, and the six sub-scores are
//! combined into a composite with validated [`ScoringWeights`].

use crate::config::{ScoringWeights, ScreenConfig};
use crate::error::ScreenError;
use crate::model::{HistoryWindow, MetricBag, ScoreRecord, SubScores, TickerMetrics};
use crate::progress::{Stage, StageSummary};
use crate::provider::MarketDataProvider;
use ordered_float::OrderedFloat;
use tracing::{debug, info, warn};

/// Imputed for missing values of every column except the put/call proxy.
pub const MISSING_DEFAULT: f64 = 0.0;

/// Imputed for a missing put/call proxy: a neutral ratio.
pub const MISSING_PUT_CALL: f64 = 1.0;

/// Bars between the benchmark's reference close and its last close.
pub const BENCHMARK_WINDOW: usize = 20;

// price momentum blend of the 1d / 5d / 20d changes
const MOMENTUM_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

// options blend of options proxy / put-call proxy percentiles
const OPTIONS_WEIGHTS: [f64; 2] = [0.7, 0.3];

// short squeeze blend of short percent / short ratio / 5d change percentiles
const SQUEEZE_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

// percentiles
// ----------------------------------------------------------------------------

/// Percentile rank in (0, 100] of every value; ties share the average rank of their group.
///
/// ```rust
/// use sift_screen::scoring::percentile_rank;
///
/// assert_eq!(percentile_rank(&[30.0, 10.0, 20.0, 40.0]), vec![75.0, 25.0, 50.0, 100.0]);
/// assert_eq!(percentile_rank(&[1.0, 2.0, 2.0, 3.0]), vec![25.0, 62.5, 62.5, 100.0]);
/// ```
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| OrderedFloat(values[i]));

    let mut pct = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && OrderedFloat(values[order[end]]) == OrderedFloat(values[order[start]]) {
            end += 1;
        }

        // 1-based ranks start+1 ..= end share their mean
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            pct[i] = avg_rank * 100.0 / n as f64;
        }
        start = end;
    }
    pct
}

/// Replace missing (or non-finite) values with `default`, for ranking only.
pub fn impute<I>(values: I, default: f64) -> Vec<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .map(|val| val.filter(|v| v.is_finite()).unwrap_or(default))
        .collect()
}

fn column(bags: &[MetricBag], field: impl Fn(&MetricBag) -> Option<f64>, default: f64) -> Vec<f64> {
    impute(bags.iter().map(field), default)
}

// benchmark
// ----------------------------------------------------------------------------

/// The benchmark's trailing return, and whether the fallback stood in for it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BenchmarkReturn {
    pub value: f64,
    pub degraded: bool,
}

/// Trailing 20-bar return (%) of `symbol`; the `fallback` stands in on any failure.
pub async fn benchmark_return(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    fallback: f64,
) -> BenchmarkReturn {
    let computed = match provider.history(symbol, HistoryWindow::ThirtyDays).await {
        Ok(bars) if bars.len() > BENCHMARK_WINDOW => {
            let last = bars[bars.len() - 1].close;
            let reference = bars[bars.len() - 1 - BENCHMARK_WINDOW].close;
            let value = (last - reference) / reference * 100.0;
            if reference > 0.0 && value.is_finite() {
                Ok(value)
            } else {
                Err(format!("invalid reference close {reference}"))
            }
        }
        Ok(bars) => Err(format!(
            "{} bars, need more than {BENCHMARK_WINDOW}",
            bars.len()
        )),
        Err(err) => Err(err.to_string()),
    };

    match computed {
        Ok(value) => {
            info!("{symbol} {BENCHMARK_WINDOW}-day return: {value:.2}%");
            BenchmarkReturn {
                value,
                degraded: false,
            }
        }
        Err(reason) => {
            let err = ScreenError::source_unavailable(symbol, reason);
            warn!("{err}; using fallback benchmark return of {fallback}%");
            BenchmarkReturn {
                value: fallback,
                degraded: true,
            }
        }
    }
}

// scoring
// ----------------------------------------------------------------------------

/// Score every row of the snapshot; output is sorted by composite score, descending.
///
/// Rows with equal composites keep their input order and share a dense rank.
pub fn score(rows: &[TickerMetrics], benchmark: f64, weights: &ScoringWeights) -> Vec<ScoreRecord> {
    if rows.is_empty() {
        return vec![];
    }
    let bags: Vec<MetricBag> = rows.iter().map(TickerMetrics::bag).collect();

    let change_1d = column(&bags, |b| b.change_1d, MISSING_DEFAULT);
    let change_5d = column(&bags, |b| b.change_5d, MISSING_DEFAULT);
    let change_20d = column(&bags, |b| b.change_20d, MISSING_DEFAULT);

    let volume = percentile_rank(&column(&bags, |b| b.volume_ratio, MISSING_DEFAULT));

    let momentum: Vec<f64> = (0..bags.len())
        .map(|i| {
            MOMENTUM_WEIGHTS[0] * change_1d[i]
                + MOMENTUM_WEIGHTS[1] * change_5d[i]
                + MOMENTUM_WEIGHTS[2] * change_20d[i]
        })
        .collect();
    let price_change = percentile_rank(&momentum);

    let relative: Vec<f64> = change_20d.iter().map(|c| c - benchmark).collect();
    let relative_strength = percentile_rank(&relative);

    let historical_vol = percentile_rank(&column(&bags, |b| b.hist_vol_1y, MISSING_DEFAULT));

    let options_pct = percentile_rank(&column(&bags, |b| b.options_proxy, MISSING_DEFAULT));
    let put_call_pct = percentile_rank(&column(&bags, |b| b.put_call_proxy, MISSING_PUT_CALL));

    let short_percent_pct = percentile_rank(&column(&bags, |b| b.short_percent, MISSING_DEFAULT));
    let short_ratio_pct = percentile_rank(&column(&bags, |b| b.short_ratio, MISSING_DEFAULT));
    let change_5d_pct = percentile_rank(&change_5d);

    let mut records: Vec<ScoreRecord> = rows
        .iter()
        .zip(bags)
        .enumerate()
        .map(|(i, (row, metrics))| {
            let scores = SubScores {
                volume: volume[i],
                price_change: price_change[i],
                relative_strength: relative_strength[i],
                historical_vol: historical_vol[i],
                options: OPTIONS_WEIGHTS[0] * options_pct[i] + OPTIONS_WEIGHTS[1] * put_call_pct[i],
                short_squeeze: SQUEEZE_WEIGHTS[0] * short_percent_pct[i]
                    + SQUEEZE_WEIGHTS[1] * short_ratio_pct[i]
                    + SQUEEZE_WEIGHTS[2] * change_5d_pct[i],
            };
            ScoreRecord {
                ticker: row.ticker.clone(),
                metrics,
                composite: composite(&scores, weights),
                scores,
                rank: 0,
            }
        })
        .collect();

    // stable: equal composites keep input order
    records.sort_by(|a, b| OrderedFloat(b.composite).cmp(&OrderedFloat(a.composite)));
    dense_rank(&mut records);
    records
}

/// Weighted sum of the six sub-scores.
pub fn composite(scores: &SubScores, weights: &ScoringWeights) -> f64 {
    scores.volume * weights.volume
        + scores.price_change * weights.price_change
        + scores.relative_strength * weights.relative_strength
        + scores.historical_vol * weights.historical_vol
        + scores.options * weights.options
        + scores.short_squeeze * weights.short_squeeze
}

// records must already be sorted by composite, descending
fn dense_rank(records: &mut [ScoreRecord]) {
    let mut rank = 0;
    let mut previous: Option<f64> = None;
    for record in records.iter_mut() {
        if previous != Some(record.composite) {
            rank += 1;
            previous = Some(record.composite);
        }
        record.rank = rank;
    }
}

/// The scoring stage: validates the weights, then scores the snapshot.
pub fn run(
    rows: &[TickerMetrics],
    benchmark: &BenchmarkReturn,
    config: &ScreenConfig,
) -> Result<(Vec<ScoreRecord>, StageSummary), ScreenError> {
    config.weights.validate()?;
    if benchmark.degraded {
        debug!(
            "scoring with fallback benchmark return {}%",
            benchmark.value
        );
    }

    let records = score(rows, benchmark.value, &config.weights);
    let summary = StageSummary {
        stage: Stage::Scoring,
        processed: rows.len(),
        succeeded: rows.iter().filter(|row| row.is_collected()).count(),
    };
    info!("{summary}");
    Ok((records, summary))
}
