use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// The four pipeline stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Universe,
    Fundamentals,
    Metrics,
    Scoring,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Universe => write!(f, "universe"),
            Self::Fundamentals => write!(f, "fundamental filter"),
            Self::Metrics => write!(f, "metrics collector"),
            Self::Scoring => write!(f, "composite scorer"),
        }
    }
}

/// Tickers processed vs succeeded by one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: Stage,
    pub processed: usize,
    pub succeeded: usize,
}

impl StageSummary {
    pub fn failed(&self) -> usize {
        self.processed.saturating_sub(self.succeeded)
    }
}

impl std::fmt::Display for StageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} processed, {} succeeded, {} failed",
            self.stage,
            self.processed,
            self.succeeded,
            self.failed()
        )
    }
}

/// Per-ticker progress of a stage: counters always, progress bars only with the tui.
pub struct StageProgress {
    stage: Stage,
    multi: Option<MultiProgress>,
    total: ProgressBar,
    success: ProgressBar,
    fail: ProgressBar,
    processed: AtomicUsize,
    succeeded: AtomicUsize,
}

impl StageProgress {
    pub fn new(stage: Stage, len: usize, tui: bool) -> Self {
        if tui {
            if let Ok((multi, total, success, fail)) = multi_progress(len) {
                return Self::with_bars(stage, Some(multi), total, success, fail);
            }
        }
        Self::with_bars(
            stage,
            None,
            ProgressBar::hidden(),
            ProgressBar::hidden(),
            ProgressBar::hidden(),
        )
    }

    /// Counters only; nothing is rendered.
    pub fn hidden(stage: Stage) -> Self {
        Self::new(stage, 0, false)
    }

    fn with_bars(
        stage: Stage,
        multi: Option<MultiProgress>,
        total: ProgressBar,
        success: ProgressBar,
        fail: ProgressBar,
    ) -> Self {
        Self {
            stage,
            multi,
            total,
            success,
            fail,
            processed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
        }
    }

    /// A spinner describing the work currently in flight for a ticker.
    pub fn spinner(&self, msg: String) -> ProgressBar {
        match &self.multi {
            Some(m) => {
                let spinner = m.add(
                    ProgressBar::new_spinner().with_message(msg).with_style(
                        ProgressStyle::default_spinner()
                            .template("\t   > {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                    ),
                );
                spinner.enable_steady_tick(Duration::from_millis(50));
                spinner
            }
            None => ProgressBar::hidden(),
        }
    }

    pub fn success(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.success.inc(1);
        self.total.inc(1);
    }

    pub fn failure(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.fail.inc(1);
        self.total.inc(1);
    }

    /// Clear the bars and log the stage summary.
    pub fn finish(self) -> StageSummary {
        self.total.finish_and_clear();
        self.success.finish_and_clear();
        self.fail.finish_and_clear();
        if let Some(multi) = &self.multi {
            let _ = multi.clear();
        }

        let summary = StageSummary {
            stage: self.stage,
            processed: self.processed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
        };
        info!("{summary}");
        summary
    }
}

fn multi_progress(
    len: usize,
) -> anyhow::Result<(MultiProgress, ProgressBar, ProgressBar, ProgressBar)> {
    // overall multi progress bar
    let multi = MultiProgress::new();

    // total number of tickers to process
    let total = multi.add(
        ProgressBar::new(len as u64).with_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.magenta}\n \
                        {msg:>9.white} |{bar:57.white/grey}| {pos:<2} / {human_len} \
                        ({percent_precise}%) [Time: {elapsed}, Rate: {per_sec}, ETA: {eta}]",
                )?
                .progress_chars("## "),
        ),
    );
    total.set_message("total");
    total.enable_steady_tick(Duration::from_millis(100));

    // total successful tickers
    let success = multi.insert_after(
        &total,
        ProgressBar::new(len as u64).with_style(
            ProgressStyle::default_bar()
                .template(" {msg:>9.green} |{bar:57.green}| {pos:<2.green}")?
                .progress_chars("## "),
        ),
    );
    success.set_message("successes");

    // total failed tickers
    let fail = multi.insert_after(
        &success,
        ProgressBar::new(len as u64).with_style(
            ProgressStyle::default_bar()
                .template(" {msg:>9.red} |{bar:57.red}| {pos:<2.red}")?
                .progress_chars("## "),
        ),
    );
    fail.set_message("failures");

    Ok((multi, total, success, fail))
}
