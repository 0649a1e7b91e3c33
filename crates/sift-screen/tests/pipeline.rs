use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use sift_screen::model::{
    FundamentalRecord, HistoryWindow, InfoSnapshot, Listing, OptionChain, OptionContract,
    PriceBar, Universe,
};
use sift_screen::progress::Stage;
use sift_screen::provider::{
    FundamentalsProvider, ListingSource, MarketDataProvider, ProviderResult,
};
use sift_screen::snapshot::{self, SnapshotDir};
use sift_screen::{Pipeline, ProviderError, ScoringWeights, ScreenConfig, ScreenError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

// fakes
// ----------------------------------------------------------------------------

struct FakeListing(Vec<&'static str>);

#[async_trait]
impl ListingSource for FakeListing {
    fn name(&self) -> &str {
        "fake listing"
    }

    async fn listing(&self) -> ProviderResult<Listing> {
        Ok(Listing {
            columns: vec!["Symbol".to_string(), "Security".to_string()],
            rows: self
                .0
                .iter()
                .map(|symbol| vec![symbol.to_string(), format!("{symbol} Inc.")])
                .collect(),
        })
    }
}

#[derive(Default)]
struct FakeFundamentals {
    records: HashMap<&'static str, Vec<f64>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFundamentals {
    fn with(records: &[(&'static str, &[f64])]) -> Self {
        Self {
            records: records.iter().map(|(k, v)| (*k, v.to_vec())).collect(),
            calls: Mutex::default(),
        }
    }
}

#[async_trait]
impl FundamentalsProvider for FakeFundamentals {
    async fn net_income(&self, ticker: &str) -> ProviderResult<Option<FundamentalRecord>> {
        self.calls.lock().unwrap().push(ticker.to_string());
        if ticker == "ERR" {
            return Err(ProviderError::Status {
                status: 500,
                url: format!("https://fundamentals.test/{ticker}"),
            });
        }
        Ok(self
            .records
            .get(ticker)
            .map(|values| FundamentalRecord::from_values(values)))
    }
}

#[derive(Default)]
struct FakeMarket {
    /// Benchmark history is served only when set.
    benchmark: Option<Vec<PriceBar>>,
    calls: Mutex<Vec<String>>,
}

fn bars(n: usize, start: f64, step: f64) -> Vec<PriceBar> {
    let first = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = start + step * i as f64 + if i % 2 == 0 { 0.5 } else { -0.5 };
            PriceBar {
                date: first + Days::new(i as u64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0 + 10.0 * i as f64,
            }
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn history(&self, ticker: &str, window: HistoryWindow) -> ProviderResult<Vec<PriceBar>> {
        self.calls.lock().unwrap().push(ticker.to_string());
        if ticker == "SPY" {
            return self
                .benchmark
                .clone()
                .ok_or_else(|| ProviderError::Unavailable("benchmark offline".to_string()));
        }
        if ticker == "DEAD" {
            return Err(ProviderError::NotFound("possibly delisted".to_string()));
        }
        Ok(match window {
            HistoryWindow::OneYear => bars(252, 100.0, 0.1),
            HistoryWindow::ThirtyDays => bars(22, 120.0, 0.5),
        })
    }

    async fn info(&self, ticker: &str) -> ProviderResult<InfoSnapshot> {
        self.calls.lock().unwrap().push(ticker.to_string());
        Ok(InfoSnapshot {
            short_ratio: Some(2.5),
            short_percent_of_float: Some(0.04),
            ..Default::default()
        })
    }

    async fn option_expiries(&self, ticker: &str) -> ProviderResult<Vec<NaiveDate>> {
        self.calls.lock().unwrap().push(ticker.to_string());
        if ticker == "NOOPT" {
            return Ok(vec![]);
        }
        Ok(vec![NaiveDate::from_ymd_opt(2024, 2, 16).unwrap()])
    }

    async fn option_chain(&self, ticker: &str, expiry: NaiveDate) -> ProviderResult<OptionChain> {
        self.calls.lock().unwrap().push(ticker.to_string());
        if ticker == "OPTERR" {
            return Err(ProviderError::Request("connection reset".to_string()));
        }
        let contract = |volume| OptionContract {
            contract: format!("{ticker}240216C00100000"),
            strike: 100.0,
            volume: Some(volume),
        };
        Ok(OptionChain {
            expiry: Some(expiry),
            calls: vec![contract(300.0)],
            puts: vec![contract(150.0)],
        })
    }
}

fn config() -> ScreenConfig {
    ScreenConfig {
        request_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn fundamentals() -> FakeFundamentals {
    FakeFundamentals::with(&[
        ("A", &[5.0, 6.0, 7.0]),
        ("B", &[5.0, 4.0, 6.0]),
        ("C", &[6.0, 7.0]),
    ])
}

// tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn only_growing_earners_reach_the_results() {
    let listing = FakeListing(vec!["A", "B", "C"]);
    let fundamentals = fundamentals();
    let market = FakeMarket {
        benchmark: Some(bars(25, 400.0, 1.0)),
        ..Default::default()
    };

    let report = Pipeline::new(&listing, &fundamentals, &market, config())
        .run()
        .await
        .unwrap();

    assert_eq!(report.universe.tickers(), &["A", "B", "C"]);
    assert_eq!(report.survivors.tickers(), &["A"]);
    assert_eq!(*fundamentals.calls.lock().unwrap(), vec!["A", "B", "C"]);

    // the collector only ever saw A, plus the benchmark
    let market_calls = market.calls.lock().unwrap();
    assert!(market_calls.iter().all(|t| t == "A" || t == "SPY"));
    assert!(!market_calls.iter().any(|t| t == "B" || t == "C"));

    assert_eq!(report.results.len(), 1);
    let top = &report.results[0];
    assert_eq!(top.ticker, "A");
    assert_eq!(top.rank, 1);
    // a lone ticker sits at the 100th percentile of every column
    assert!((top.composite - 100.0).abs() < 1e-9);

    let benchmark = report.benchmark.unwrap();
    assert!(!benchmark.degraded);
    assert_eq!(report.summaries.len(), 4);
}

#[tokio::test]
async fn benchmark_failure_falls_back() {
    let listing = FakeListing(vec!["A", "B", "C"]);
    let fundamentals = fundamentals();
    let market = FakeMarket::default();

    let report = Pipeline::new(&listing, &fundamentals, &market, config())
        .run()
        .await
        .unwrap();

    let benchmark = report.benchmark.unwrap();
    assert!(benchmark.degraded);
    assert_eq!(benchmark.value, 2.0);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].rank, 1);
}

#[tokio::test]
async fn invalid_weights_fail_before_any_fetch() {
    let listing = FakeListing(vec!["A"]);
    let fundamentals = fundamentals();
    let market = FakeMarket::default();
    let config = ScreenConfig {
        weights: ScoringWeights {
            volume: 0.5,
            ..Default::default()
        },
        ..config()
    };

    let result = Pipeline::new(&listing, &fundamentals, &market, config)
        .run()
        .await;

    assert!(matches!(result, Err(ScreenError::Configuration(_))));
    assert!(fundamentals.calls.lock().unwrap().is_empty());
    assert!(market.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_universe_stops_gracefully() {
    let listing = FakeListing(vec![]);
    let fundamentals = fundamentals();
    let market = FakeMarket::default();

    let report = Pipeline::new(&listing, &fundamentals, &market, config())
        .run()
        .await
        .unwrap();

    assert!(report.stopped_early());
    assert!(report.results.is_empty());
    assert!(fundamentals.calls.lock().unwrap().is_empty());
    assert!(market.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stages_chain_through_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let listing = FakeListing(vec!["A", "B", "C"]);
    let fundamentals = fundamentals();
    let market = FakeMarket::default();
    let config = ScreenConfig {
        snapshot_dir: Some(dir.path().to_path_buf()),
        ..config()
    };
    let pipeline = Pipeline::new(&listing, &fundamentals, &market, config);

    assert_eq!(pipeline.universe_stage().await.unwrap().len(), 3);
    assert_eq!(pipeline.filter_stage().await.unwrap().tickers(), &["A"]);
    let rows = pipeline.collect_stage().await.unwrap();
    assert!(rows[0].is_collected());

    let results = pipeline.score_stage().await.unwrap();
    assert_eq!(results[0].ticker, "A");

    let snapshots = SnapshotDir::new(dir.path());
    for file in [
        snapshot::UNIVERSE_FILE,
        snapshot::FILTERED_FILE,
        snapshot::METRICS_FILE,
        snapshot::SCORES_FILE,
    ] {
        assert!(snapshots.path(file).exists(), "{file} missing");
    }
    assert_eq!(snapshots.read_scores().unwrap(), results);
}

#[tokio::test]
async fn single_stage_without_its_input_is_a_snapshot_error() {
    let dir = tempfile::tempdir().unwrap();
    let listing = FakeListing(vec!["A"]);
    let fundamentals = fundamentals();
    let market = FakeMarket::default();
    let config = ScreenConfig {
        snapshot_dir: Some(dir.path().to_path_buf()),
        ..config()
    };

    let result = Pipeline::new(&listing, &fundamentals, &market, config)
        .collect_stage()
        .await;
    assert!(matches!(result, Err(ScreenError::Snapshot { .. })));
}

#[tokio::test]
async fn a_failing_ticker_is_dropped_by_the_filter_alone() {
    let fundamentals = FakeFundamentals::with(&[("A", &[5.0, 6.0, 7.0]), ("B", &[1.0, 1.0, 2.0])]);
    let universe = Universe::new(["A", "ERR", "B"]);

    let (survivors, summary) =
        sift_screen::fundamentals::filter(&fundamentals, &universe, &config()).await;

    assert_eq!(survivors.tickers(), &["A", "B"]);
    assert_eq!(*fundamentals.calls.lock().unwrap(), vec!["A", "ERR", "B"]);
    assert_eq!(summary.stage, Stage::Fundamentals);
    assert_eq!(
        summary.to_string(),
        "fundamental filter: 3 processed, 2 succeeded, 1 failed"
    );
}

#[tokio::test]
async fn collector_failures_stay_with_their_ticker() {
    let market = FakeMarket::default();
    let universe = Universe::new(["DEAD", "NOOPT", "OPTERR", "A"]);

    let (rows, summary) = sift_screen::metrics::collect(&market, &universe, &config()).await;

    let tickers: Vec<&str> = rows.iter().map(|row| row.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["DEAD", "NOOPT", "OPTERR", "A"]);
    assert_eq!((summary.processed, summary.succeeded), (4, 3));

    // history failed: the whole bag is missing
    assert!(!rows[0].is_collected());
    assert!(rows[0].bag().is_all_missing());

    // options failed or absent: only the two proxies are missing
    for row in &rows[1..3] {
        assert!(row.is_collected(), "{} not collected", row.ticker);
        let bag = row.bag();
        assert_eq!(bag.options_proxy, None);
        assert_eq!(bag.put_call_proxy, None);
        for value in [
            bag.hist_vol_1y,
            bag.volume_ratio,
            bag.avg_volume_20d,
            bag.change_1d,
            bag.change_5d,
            bag.change_20d,
            bag.short_ratio,
            bag.short_percent,
        ] {
            assert!(value.is_some(), "{} lost a non-options metric", row.ticker);
        }
    }

    let bag = rows[3].bag();
    assert!(bag.options_proxy.is_some());
    assert_eq!(bag.put_call_proxy, Some(0.5));
}
