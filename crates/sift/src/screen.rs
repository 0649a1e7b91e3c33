use crate::cli::{Commands, ScreenOpts};
use colored::Colorize;
use sift_screen::model::ScoreRecord;
use sift_screen::provider::ListingSource;
use sift_screen::scoring::BenchmarkReturn;
use sift_screen::{Pipeline, ScoringWeights, ScreenConfig};
use sift_spider::stock::{CsvListing, SecFundamentals, Sp500Listing, YahooFinance};
use std::time::Duration;
use tracing::{debug, error, info};

/// Run a `sift` command.
pub(crate) async fn run(command: Commands, opts: &ScreenOpts, tui: bool) -> anyhow::Result<()> {
    let time = std::time::Instant::now();
    let no_snapshots = matches!(command, Commands::Run { no_snapshots: true });
    let config = config(opts, tui, no_snapshots)?;

    let needs_sec = matches!(command, Commands::Run { .. } | Commands::Filter);
    let providers = Providers::new(opts, needs_sec)?;
    let pipeline = Pipeline::new(
        providers.listing.as_ref(),
        &providers.fundamentals,
        &providers.market,
        config,
    );

    match command {
        // `sift run`: every stage, in memory, snapshots on the way
        Commands::Run { .. } => {
            let report = pipeline.run().await?;
            if tui {
                for summary in &report.summaries {
                    println!("{summary}");
                }
            }
            match &report.benchmark {
                Some(benchmark) => print_results(&report.results, benchmark, opts.top),
                None => println!("{}", "no tickers left to score".yellow()),
            }
        }

        Commands::Universe => {
            let universe = pipeline.universe_stage().await?;
            println!("{} tickers in the universe", universe.len());
        }

        Commands::Filter => {
            let survivors = pipeline.filter_stage().await?;
            println!("{} tickers passed the net income filter", survivors.len());
        }

        Commands::Collect => {
            let rows = pipeline.collect_stage().await?;
            let collected = rows.iter().filter(|row| row.is_collected()).count();
            println!("screening metrics collected for {collected} of {} tickers", rows.len());
        }

        Commands::Score => {
            let results = pipeline.score_stage().await?;
            println!("{} tickers scored", results.len());
            print_table(&results, opts.top);
        }
    }

    info!("sift finished, time elapsed: {:?}", time.elapsed());
    Ok(())
}

fn config(opts: &ScreenOpts, tui: bool, no_snapshots: bool) -> anyhow::Result<ScreenConfig> {
    let weights = match &opts.weights {
        Some(path) => {
            debug!("reading scoring weights from {}", path.display());
            let json = std::fs::read_to_string(path).map_err(|err| {
                error!("failed to read weights file {}, error({err})", path.display());
                err
            })?;
            serde_json::from_str(&json).map_err(|err| {
                error!("failed to parse weights file {}, error({err})", path.display());
                err
            })?
        }
        None => ScoringWeights::default(),
    };

    let config = ScreenConfig {
        weights,
        request_delay: Duration::from_millis(opts.delay_ms),
        concurrency: opts.concurrency,
        limit: opts.limit,
        benchmark_symbol: opts.benchmark.clone(),
        benchmark_fallback: opts.benchmark_fallback,
        snapshot_dir: (!no_snapshots).then(|| opts.data_dir.clone()),
        tui,
    };
    config.validate()?;
    Ok(config)
}

struct Providers {
    listing: Box<dyn ListingSource>,
    fundamentals: SecFundamentals,
    market: YahooFinance,
}

impl Providers {
    fn new(opts: &ScreenOpts, needs_sec: bool) -> anyhow::Result<Self> {
        let client = sift_spider::std_client_build()?;

        let listing: Box<dyn ListingSource> = match &opts.listing {
            Some(path) => Box::new(CsvListing::new(path)),
            None => Box::new(Sp500Listing::new(client.clone())),
        };

        // only the filter talks to SEC, which insists on a USER_AGENT
        let sec_client = if needs_sec {
            sift_spider::sec_client_build()?
        } else {
            client.clone()
        };

        Ok(Self {
            listing,
            fundamentals: SecFundamentals::new(sec_client, &opts.buffer_dir),
            market: YahooFinance::new(client),
        })
    }
}

// output
// ----------------------------------------------------------------------------

fn print_results(results: &[ScoreRecord], benchmark: &BenchmarkReturn, top: usize) {
    let benchmark_line = format!("benchmark 20-day return: {:.2}%", benchmark.value);
    if benchmark.degraded {
        println!("{} {}", benchmark_line.yellow(), "(fallback)".yellow());
    } else {
        println!("{benchmark_line}");
    }
    print_table(results, top);
}

fn print_table(results: &[ScoreRecord], top: usize) {
    if results.is_empty() {
        println!("{}", "no results".yellow());
        return;
    }

    println!(
        "\n{}",
        format!(
            "{:>4}  {:<8} {:>9} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "rank", "ticker", "composite", "volume", "price", "rel str", "vol", "options", "squeeze"
        )
        .bold()
    );
    println!("{}", "=".repeat(82));

    for record in results.iter().take(top) {
        let s = &record.scores;
        let composite = format!("{:>9.2}", record.composite);
        let composite = if record.composite >= 75.0 {
            composite.green()
        } else if record.composite >= 50.0 {
            composite.normal()
        } else {
            composite.red()
        };
        println!(
            "{:>4}  {} {} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
            record.rank,
            format!("{:<8}", record.ticker).bold(),
            composite,
            s.volume,
            s.price_change,
            s.relative_strength,
            s.historical_vol,
            s.options,
            s.short_squeeze,
        );
    }

    if results.len() > top {
        println!("... {} more", results.len() - top);
    }
}
