use crate::config::ScreenConfig;
use crate::error::{Result, ScreenError};
use crate::model::{ScoreRecord, TickerMetrics, Universe};
use crate::progress::StageSummary;
use crate::provider::{FundamentalsProvider, ListingSource, MarketDataProvider};
use crate::scoring::{self, BenchmarkReturn};
use crate::snapshot::{self, SnapshotDir};
use crate::{fundamentals, metrics, universe};
use tracing::{debug, info, warn};

/// Everything a full run produced, stage by stage.
#[derive(Clone, Debug, Default)]
pub struct PipelineReport {
    pub universe: Universe,
    pub survivors: Universe,
    pub metrics: Vec<TickerMetrics>,
    /// `None` when the run stopped before scoring.
    pub benchmark: Option<BenchmarkReturn>,
    pub results: Vec<ScoreRecord>,
    pub summaries: Vec<StageSummary>,
}

impl PipelineReport {
    /// Whether the run stopped early for lack of tickers.
    pub fn stopped_early(&self) -> bool {
        self.benchmark.is_none()
    }
}

/// The four stages, bound to their providers.
pub struct Pipeline<'a> {
    listing: &'a dyn ListingSource,
    fundamentals: &'a dyn FundamentalsProvider,
    market: &'a dyn MarketDataProvider,
    config: ScreenConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        listing: &'a dyn ListingSource,
        fundamentals: &'a dyn FundamentalsProvider,
        market: &'a dyn MarketDataProvider,
        config: ScreenConfig,
    ) -> Self {
        Self {
            listing,
            fundamentals,
            market,
            config,
        }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Run every stage in memory, writing snapshots along the way when a directory is set.
    ///
    /// Configuration is validated before any provider is touched. An empty universe, or a filter
    /// that lets nothing through, ends the run early with an empty result set.
    pub async fn run(&self) -> Result<PipelineReport> {
        self.config.validate()?;
        let snapshots = self.config.snapshot_dir.as_ref().map(SnapshotDir::new);
        let mut report = PipelineReport::default();

        // 1. universe
        let (universe, summary) = universe::build(self.listing, self.config.limit).await;
        report.summaries.push(summary);
        if let Some(snapshots) = &snapshots {
            snapshots.write_universe(snapshot::UNIVERSE_FILE, &universe)?;
        }
        if universe.is_empty() {
            warn!("no tickers to screen, stopping");
            return Ok(report);
        }

        // 2. fundamental filter
        let (survivors, summary) =
            fundamentals::filter(self.fundamentals, &universe, &self.config).await;
        report.universe = universe;
        report.summaries.push(summary);
        if let Some(snapshots) = &snapshots {
            snapshots.write_universe(snapshot::FILTERED_FILE, &survivors)?;
        }
        if survivors.is_empty() {
            warn!("no tickers passed the net income filter, stopping");
            report.survivors = survivors;
            return Ok(report);
        }

        // 3. metrics
        let (rows, summary) = metrics::collect(self.market, &survivors, &self.config).await;
        report.survivors = survivors;
        report.summaries.push(summary);
        if let Some(snapshots) = &snapshots {
            snapshots.write_metrics(&rows)?;
        }

        // 4. scoring
        let benchmark = self.benchmark().await;
        let (results, summary) = scoring::run(&rows, &benchmark, &self.config)?;
        report.metrics = rows;
        report.summaries.push(summary);
        if let Some(snapshots) = &snapshots {
            snapshots.write_scores(&results)?;
        }

        report.benchmark = Some(benchmark);
        report.results = results;
        info!("screen complete, {} tickers ranked", report.results.len());
        Ok(report)
    }

    // single stages
    // ----------------------------------------------------------------------------
    //
    // Each reads its predecessor's snapshot and writes its own.

    /// Build the universe and write it to the snapshot directory.
    pub async fn universe_stage(&self) -> Result<Universe> {
        self.config.validate()?;
        let snapshots = self.snapshots()?;

        let universe = universe::try_build(self.listing, self.config.limit).await?;
        let path = snapshots.write_universe(snapshot::UNIVERSE_FILE, &universe)?;
        info!("{} tickers saved to {}", universe.len(), path.display());
        Ok(universe)
    }

    pub async fn filter_stage(&self) -> Result<Universe> {
        self.config.validate()?;
        let snapshots = self.snapshots()?;

        let universe = snapshots.read_universe(snapshot::UNIVERSE_FILE)?;
        let (survivors, _) = fundamentals::filter(self.fundamentals, &universe, &self.config).await;
        let path = snapshots.write_universe(snapshot::FILTERED_FILE, &survivors)?;
        info!("{} tickers saved to {}", survivors.len(), path.display());
        Ok(survivors)
    }

    pub async fn collect_stage(&self) -> Result<Vec<TickerMetrics>> {
        self.config.validate()?;
        let snapshots = self.snapshots()?;

        let survivors = snapshots.read_universe(snapshot::FILTERED_FILE)?;
        let (rows, _) = metrics::collect(self.market, &survivors, &self.config).await;
        let path = snapshots.write_metrics(&rows)?;
        info!("{} rows saved to {}", rows.len(), path.display());
        Ok(rows)
    }

    pub async fn score_stage(&self) -> Result<Vec<ScoreRecord>> {
        self.config.validate()?;
        let snapshots = self.snapshots()?;

        let rows = snapshots.read_metrics()?;
        let benchmark = self.benchmark().await;
        let (results, _) = scoring::run(&rows, &benchmark, &self.config)?;
        let path = snapshots.write_scores(&results)?;
        info!("{} results saved to {}", results.len(), path.display());
        Ok(results)
    }

    async fn benchmark(&self) -> BenchmarkReturn {
        debug!("fetching benchmark {}", self.config.benchmark_symbol);
        scoring::benchmark_return(
            self.market,
            &self.config.benchmark_symbol,
            self.config.benchmark_fallback,
        )
        .await
    }

    fn snapshots(&self) -> Result<SnapshotDir> {
        self.config
            .snapshot_dir
            .as_ref()
            .map(SnapshotDir::new)
            .ok_or_else(|| {
                ScreenError::Configuration(
                    "a snapshot directory is required to run a single stage".to_string(),
                )
            })
    }
}
