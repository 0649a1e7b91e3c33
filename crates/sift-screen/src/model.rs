use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// universe
// ----------------------------------------------------------------------------

/// An ordered set of unique ticker symbols.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Universe(Vec<String>);

impl Universe {
    /// Build a universe from raw symbols; the first occurrence of a symbol wins its position.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let tickers = symbols
            .into_iter()
            .map(Into::into)
            .filter(|ticker: &String| seen.insert(ticker.clone()))
            .collect();
        Self(tickers)
    }

    /// Keep only the first `k` tickers.
    pub fn truncated(mut self, k: usize) -> Self {
        self.0.truncate(k);
        self
    }

    pub fn tickers(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Universe {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A raw table returned by a listing source, e.g., the S&P 500 constituents table.
#[derive(Clone, Debug, Default)]
pub struct Listing {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// fundamentals
// ----------------------------------------------------------------------------

/// One fiscal period of net income.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Period {
    pub end: NaiveDate,
    pub net_income: f64,
}

/// Annual net income history, ordered oldest → newest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FundamentalRecord {
    periods: Vec<Period>,
}

impl FundamentalRecord {
    /// Build a record from periods in any order; they are sorted chronologically.
    pub fn new(mut periods: Vec<Period>) -> Self {
        periods.sort_by_key(|p| p.end);
        Self { periods }
    }

    /// Build a record from plain values already ordered oldest → newest.
    ///
    /// Period end dates are synthesised as consecutive fiscal year ends.
    pub fn from_values(values: &[f64]) -> Self {
        let periods = values
            .iter()
            .enumerate()
            .map(|(i, val)| Period {
                end: NaiveDate::from_ymd_opt(2000 + i as i32, 12, 31).unwrap_or_default(),
                net_income: *val,
            })
            .collect();
        Self { periods }
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// The `n` most recent net income values, oldest → newest.
    pub fn latest(&self, n: usize) -> Option<Vec<f64>> {
        if self.periods.len() < n {
            return None;
        }
        Some(
            self.periods[self.periods.len() - n..]
                .iter()
                .map(|p| p.net_income)
                .collect(),
        )
    }
}

// market data
// ----------------------------------------------------------------------------

/// Length of daily history requested from a market data provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HistoryWindow {
    OneYear,
    ThirtyDays,
}

impl HistoryWindow {
    /// Calendar days to request. The thirty-day window asks for more than it keeps so that
    /// weekends and holidays still leave a full month of trading bars.
    pub fn calendar_days(&self) -> i64 {
        match self {
            HistoryWindow::OneYear => 365,
            HistoryWindow::ThirtyDays => 45,
        }
    }

    /// Trailing bars to keep, if capped.
    pub fn max_bars(&self) -> Option<usize> {
        match self {
            HistoryWindow::OneYear => None,
            HistoryWindow::ThirtyDays => Some(30),
        }
    }

    /// Drop all but the trailing [`max_bars`](Self::max_bars) bars, oldest first.
    pub fn trim(&self, mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
        if let Some(max) = self.max_bars() {
            if bars.len() > max {
                bars.drain(..bars.len() - max);
            }
        }
        bars
    }
}

/// One daily OHLCV bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Descriptive snapshot fields for a ticker.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InfoSnapshot {
    pub shares_outstanding: Option<f64>,
    pub float_shares: Option<f64>,
    pub short_ratio: Option<f64>,
    pub short_percent_of_float: Option<f64>,
}

/// A single option contract; only volume matters to the screen.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionContract {
    pub contract: String,
    pub strike: f64,
    pub volume: Option<f64>,
}

/// Calls and puts for one expiry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionChain {
    pub expiry: Option<NaiveDate>,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn call_volume(&self) -> f64 {
        sum_volume(&self.calls)
    }

    pub fn put_volume(&self) -> f64 {
        sum_volume(&self.puts)
    }
}

// missing volumes count as zero
fn sum_volume(contracts: &[OptionContract]) -> f64 {
    contracts
        .iter()
        .filter_map(|c| c.volume)
        .filter(|v| v.is_finite())
        .sum()
}

// metric bag
// ----------------------------------------------------------------------------

/// The raw per-ticker signals; `None` is an explicit missing marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBag {
    pub hist_vol_1y: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub avg_volume_20d: Option<f64>,
    pub change_1d: Option<f64>,
    pub change_5d: Option<f64>,
    pub change_20d: Option<f64>,
    pub options_proxy: Option<f64>,
    pub put_call_proxy: Option<f64>,
    pub short_ratio: Option<f64>,
    pub short_percent: Option<f64>,
}

impl MetricBag {
    /// A bag with every field marked missing.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_all_missing(&self) -> bool {
        *self == Self::missing()
    }
}

/// The outcome of collecting metrics for one ticker.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricOutcome {
    Collected(MetricBag),
    Missing(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TickerMetrics {
    pub ticker: String,
    pub outcome: MetricOutcome,
}

impl TickerMetrics {
    pub fn collected(ticker: impl Into<String>, bag: MetricBag) -> Self {
        Self {
            ticker: ticker.into(),
            outcome: MetricOutcome::Collected(bag),
        }
    }

    pub fn missing(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            outcome: MetricOutcome::Missing(reason.into()),
        }
    }

    /// The metric bag, all-missing for a failed ticker.
    pub fn bag(&self) -> MetricBag {
        match &self.outcome {
            MetricOutcome::Collected(bag) => *bag,
            MetricOutcome::Missing(_) => MetricBag::missing(),
        }
    }

    pub fn is_collected(&self) -> bool {
        matches!(self.outcome, MetricOutcome::Collected(_))
    }
}

// scores
// ----------------------------------------------------------------------------

/// The six 0-100 sub-scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub volume: f64,
    pub price_change: f64,
    pub relative_strength: f64,
    pub historical_vol: f64,
    pub options: f64,
    pub short_squeeze: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoreRecord {
    pub ticker: String,
    pub metrics: MetricBag,
    pub scores: SubScores,
    pub composite: f64,
    /// Dense rank; 1 is the highest composite score.
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universe_dedups_in_order() {
        let universe = Universe::new(["MSFT", "AAPL", "MSFT", "NVDA", "AAPL"]);
        assert_eq!(universe.tickers(), &["MSFT", "AAPL", "NVDA"]);
        assert_eq!(universe.truncated(2).tickers(), &["MSFT", "AAPL"]);
    }

    #[test]
    fn fundamental_record_sorts_chronologically() {
        let date = |y| NaiveDate::from_ymd_opt(y, 12, 31).unwrap();
        let record = FundamentalRecord::new(vec![
            Period { end: date(2023), net_income: 7.0 },
            Period { end: date(2021), net_income: 5.0 },
            Period { end: date(2022), net_income: 6.0 },
            Period { end: date(2020), net_income: 1.0 },
        ]);
        assert_eq!(record.latest(3), Some(vec![5.0, 6.0, 7.0]));
        assert_eq!(record.latest(5), None);
    }

    #[test]
    fn thirty_day_window_keeps_the_trailing_bars() {
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<PriceBar> = (0..40)
            .map(|i| PriceBar {
                date: first + chrono::Days::new(i),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: i as f64,
                volume: 0.0,
            })
            .collect();

        let kept = HistoryWindow::ThirtyDays.trim(bars.clone());
        assert_eq!(kept.len(), 30);
        assert_eq!(kept[0].close, 10.0);
        assert_eq!(kept[29].close, 39.0);
        assert_eq!(HistoryWindow::OneYear.trim(bars).len(), 40);
        assert_eq!(HistoryWindow::ThirtyDays.trim(vec![]).len(), 0);
    }

    #[test]
    fn option_chain_ignores_missing_volume() {
        let contract = |volume| OptionContract {
            contract: "X".to_string(),
            strike: 100.0,
            volume,
        };
        let chain = OptionChain {
            expiry: None,
            calls: vec![contract(Some(10.0)), contract(None), contract(Some(5.0))],
            puts: vec![contract(None)],
        };
        assert_eq!(chain.call_volume(), 15.0);
        assert_eq!(chain.put_volume(), 0.0);
    }
}
