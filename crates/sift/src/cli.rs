use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    ///
    /// Without a level, progress bars are shown instead of logs.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,

    #[command(flatten)]
    pub opts: ScreenOpts,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every stage, from the listing to the ranked results.
    Run {
        /// Keep everything in memory; no snapshots are written.
        #[arg(long)]
        no_snapshots: bool,
    },

    /// Build the ticker universe and save `01_tickers.csv`.
    Universe,

    /// Filter the saved universe by net income and save `02_filtered_by_net_income.csv`.
    Filter,

    /// Collect screening metrics for the filtered tickers and save `03_raw_screening_data.csv`.
    Collect,

    /// Score the saved metrics and save `04_screening_results.csv`.
    Score,
}

#[derive(Args, Debug)]
pub struct ScreenOpts {
    /// Only screen the first N tickers of the listing.
    #[arg(short, long, global = true)]
    pub limit: Option<usize>,

    /// Courtesy delay before each provider request, in milliseconds.
    #[arg(long, global = true, default_value_t = 100)]
    pub delay_ms: u64,

    /// Tickers fetched at once.
    #[arg(long, global = true, default_value_t = 1)]
    pub concurrency: usize,

    /// Benchmark symbol for relative strength.
    #[arg(long, global = true, default_value = "SPY")]
    pub benchmark: String,

    /// Benchmark 20-day return (%) used when the benchmark cannot be fetched.
    #[arg(long, global = true, default_value_t = 2.0, allow_hyphen_values = true)]
    pub benchmark_fallback: f64,

    /// JSON file of scoring weights.
    #[arg(short, long, global = true)]
    pub weights: Option<PathBuf>,

    /// Directory of stage snapshots.
    #[arg(long, global = true, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Directory for buffered downloads.
    #[arg(long, global = true, default_value = "./buffer")]
    pub buffer_dir: PathBuf,

    /// Read the universe from a CSV file instead of Wikipedia.
    #[arg(long, global = true)]
    pub listing: Option<PathBuf>,

    /// Number of results printed.
    #[arg(long, global = true, default_value_t = 20)]
    pub top: usize,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}
