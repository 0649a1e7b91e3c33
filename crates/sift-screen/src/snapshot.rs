use crate::error::{Result, ScreenError};
use crate::model::{MetricBag, ScoreRecord, SubScores, TickerMetrics, Universe};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub const UNIVERSE_FILE: &str = "01_tickers.csv";
pub const FILTERED_FILE: &str = "02_filtered_by_net_income.csv";
pub const METRICS_FILE: &str = "03_raw_screening_data.csv";
pub const SCORES_FILE: &str = "04_screening_results.csv";

/// A directory of CSV stage snapshots, one file per stage.
///
/// Missing metric values are written as empty cells.
#[derive(Clone, Debug)]
pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn write_universe(&self, file: &str, universe: &Universe) -> Result<PathBuf> {
        let rows = universe.iter().map(|ticker| TickerRow {
            ticker: ticker.clone(),
        });
        self.write(file, rows)
    }

    pub fn read_universe(&self, file: &str) -> Result<Universe> {
        let rows: Vec<TickerRow> = self.read(file)?;
        Ok(Universe::new(rows.into_iter().map(|row| row.ticker)))
    }

    pub fn write_metrics(&self, rows: &[TickerMetrics]) -> Result<PathBuf> {
        self.write(METRICS_FILE, rows.iter().map(MetricsRow::from))
    }

    /// Read the metrics snapshot; rows without a single value come back as missing.
    pub fn read_metrics(&self) -> Result<Vec<TickerMetrics>> {
        let rows: Vec<MetricsRow> = self.read(METRICS_FILE)?;
        Ok(rows.into_iter().map(TickerMetrics::from).collect())
    }

    pub fn write_scores(&self, records: &[ScoreRecord]) -> Result<PathBuf> {
        self.write(SCORES_FILE, records.iter().map(ScoreRow::from))
    }

    pub fn read_scores(&self) -> Result<Vec<ScoreRecord>> {
        let rows: Vec<ScoreRow> = self.read(SCORES_FILE)?;
        Ok(rows.into_iter().map(ScoreRecord::from).collect())
    }

    fn write<T, I>(&self, file: &str, rows: I) -> Result<PathBuf>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let path = self.path(file);
        let err = |reason: String| snapshot_error(&path, reason);

        std::fs::create_dir_all(&self.root).map_err(|e| err(e.to_string()))?;
        let mut writer = csv::Writer::from_path(&path).map_err(|e| err(e.to_string()))?;
        let mut count = 0;
        for row in rows {
            writer.serialize(row).map_err(|e| err(e.to_string()))?;
            count += 1;
        }
        writer.flush().map_err(|e| err(e.to_string()))?;

        debug!("{count} rows written to {}", path.display());
        Ok(path)
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.path(file);
        trace!("reading snapshot at path: {}", path.display());

        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| snapshot_error(&path, e.to_string()))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<T>, csv::Error>>()
            .map_err(|e| snapshot_error(&path, e.to_string()))
    }
}

fn snapshot_error(path: &Path, reason: String) -> ScreenError {
    ScreenError::Snapshot {
        path: path.display().to_string(),
        reason,
    }
}

// rows
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct TickerRow {
    ticker: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetricsRow {
    ticker: String,
    hist_vol_1y: Option<f64>,
    volume_ratio: Option<f64>,
    avg_volume_20d: Option<f64>,
    change_1d: Option<f64>,
    change_5d: Option<f64>,
    change_20d: Option<f64>,
    options_proxy: Option<f64>,
    put_call_proxy: Option<f64>,
    short_ratio: Option<f64>,
    short_percent: Option<f64>,
}

impl MetricsRow {
    fn new(ticker: String, bag: MetricBag) -> Self {
        Self {
            ticker,
            hist_vol_1y: bag.hist_vol_1y,
            volume_ratio: bag.volume_ratio,
            avg_volume_20d: bag.avg_volume_20d,
            change_1d: bag.change_1d,
            change_5d: bag.change_5d,
            change_20d: bag.change_20d,
            options_proxy: bag.options_proxy,
            put_call_proxy: bag.put_call_proxy,
            short_ratio: bag.short_ratio,
            short_percent: bag.short_percent,
        }
    }

    fn bag(&self) -> MetricBag {
        MetricBag {
            hist_vol_1y: self.hist_vol_1y,
            volume_ratio: self.volume_ratio,
            avg_volume_20d: self.avg_volume_20d,
            change_1d: self.change_1d,
            change_5d: self.change_5d,
            change_20d: self.change_20d,
            options_proxy: self.options_proxy,
            put_call_proxy: self.put_call_proxy,
            short_ratio: self.short_ratio,
            short_percent: self.short_percent,
        }
    }
}

impl From<&TickerMetrics> for MetricsRow {
    fn from(row: &TickerMetrics) -> Self {
        Self::new(row.ticker.clone(), row.bag())
    }
}

impl From<MetricsRow> for TickerMetrics {
    fn from(row: MetricsRow) -> Self {
        let bag = row.bag();
        if bag.is_all_missing() {
            TickerMetrics::missing(row.ticker, "no metrics recorded in snapshot")
        } else {
            TickerMetrics::collected(row.ticker, bag)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ScoreRow {
    rank: u32,
    ticker: String,
    composite_score: f64,
    volume_score: f64,
    price_change_score: f64,
    relative_strength_score: f64,
    historical_vol_score: f64,
    options_score: f64,
    short_squeeze_score: f64,
    hist_vol_1y: Option<f64>,
    volume_ratio: Option<f64>,
    avg_volume_20d: Option<f64>,
    change_1d: Option<f64>,
    change_5d: Option<f64>,
    change_20d: Option<f64>,
    options_proxy: Option<f64>,
    put_call_proxy: Option<f64>,
    short_ratio: Option<f64>,
    short_percent: Option<f64>,
}

impl From<&ScoreRecord> for ScoreRow {
    fn from(record: &ScoreRecord) -> Self {
        let m = &record.metrics;
        let s = &record.scores;
        Self {
            rank: record.rank,
            ticker: record.ticker.clone(),
            composite_score: record.composite,
            volume_score: s.volume,
            price_change_score: s.price_change,
            relative_strength_score: s.relative_strength,
            historical_vol_score: s.historical_vol,
            options_score: s.options,
            short_squeeze_score: s.short_squeeze,
            hist_vol_1y: m.hist_vol_1y,
            volume_ratio: m.volume_ratio,
            avg_volume_20d: m.avg_volume_20d,
            change_1d: m.change_1d,
            change_5d: m.change_5d,
            change_20d: m.change_20d,
            options_proxy: m.options_proxy,
            put_call_proxy: m.put_call_proxy,
            short_ratio: m.short_ratio,
            short_percent: m.short_percent,
        }
    }
}

impl From<ScoreRow> for ScoreRecord {
    fn from(row: ScoreRow) -> Self {
        Self {
            metrics: MetricBag {
                hist_vol_1y: row.hist_vol_1y,
                volume_ratio: row.volume_ratio,
                avg_volume_20d: row.avg_volume_20d,
                change_1d: row.change_1d,
                change_5d: row.change_5d,
                change_20d: row.change_20d,
                options_proxy: row.options_proxy,
                put_call_proxy: row.put_call_proxy,
                short_ratio: row.short_ratio,
                short_percent: row.short_percent,
            },
            scores: SubScores {
                volume: row.volume_score,
                price_change: row.price_change_score,
                relative_strength: row.relative_strength_score,
                historical_vol: row.historical_vol_score,
                options: row.options_score,
                short_squeeze: row.short_squeeze_score,
            },
            composite: row.composite_score,
            rank: row.rank,
            ticker: row.ticker,
        }
    }
}
