use crate::config::ScreenConfig;
use crate::error::ScreenError;
use crate::model::{FundamentalRecord, Universe};
use crate::progress::{Stage, StageProgress, StageSummary};
use crate::provider::FundamentalsProvider;
use futures::{stream, StreamExt};
use tracing::{debug, error, info, trace};

/// Number of most recent fiscal periods tested.
pub const PERIODS: usize = 3;

/// Why a ticker did or did not survive the filter.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Kept,
    /// Failed the profitability trend test, or lacked the data to take it.
    Dropped(String),
}

/// Profitability trend test over the latest [`PERIODS`] net income values.
///
/// ```rust
/// use sift_screen::fundamentals::judge;
/// use sift_screen::model::FundamentalRecord;
///
/// assert!(judge(&FundamentalRecord::from_values(&[5.0, 6.0, 7.0])).is_kept());
/// assert!(!judge(&FundamentalRecord::from_values(&[5.0, 4.0, 6.0])).is_kept());
/// ```
pub fn judge(record: &FundamentalRecord) -> Verdict {
    let Some(values) = record.latest(PERIODS) else {
        return Verdict::Dropped(format!(
            "{} of {PERIODS} periods of net income",
            record.periods().len()
        ));
    };

    if let Some(val) = values.iter().find(|val| !(**val > 0.0)) {
        return Verdict::Dropped(format!("non-positive net income {val}"));
    }

    if values.windows(2).any(|pair| pair[0] > pair[1]) {
        return Verdict::Dropped(format!("decreasing net income {values:?}"));
    }

    Verdict::Kept
}

impl Verdict {
    pub fn is_kept(&self) -> bool {
        matches!(self, Verdict::Kept)
    }
}

/// Keep only the tickers of `universe` with positive, non-decreasing net income.
///
/// Provider failures drop the failing ticker only. Survivors keep their relative order.
pub async fn filter(
    provider: &dyn FundamentalsProvider,
    universe: &Universe,
    config: &ScreenConfig,
) -> (Universe, StageSummary) {
    info!(
        "filtering {} tickers by net income for the last {PERIODS} years ...",
        universe.len()
    );
    let progress = StageProgress::new(Stage::Fundamentals, universe.len(), config.tui);

    let verdicts: Vec<(&String, Verdict)> = stream::iter(universe.iter())
        .map(|ticker| {
            let progress = &progress;
            async move {
                let spinner =
                    progress.spinner(format!("checking net income for [{ticker}]"));
                tokio::time::sleep(config.request_delay).await;

                let verdict = match provider.net_income(ticker).await {
                    Ok(Some(record)) => judge(&record),
                    Ok(None) => Verdict::Dropped("no net income line item".to_string()),
                    Err(err) => {
                        let err = ScreenError::per_ticker(ticker.as_str(), err);
                        error!("skipping during net income check, {err}");
                        Verdict::Dropped(err.to_string())
                    }
                };
                spinner.finish_and_clear();

                match &verdict {
                    Verdict::Kept => {
                        trace!("[{ticker}] kept");
                        progress.success();
                    }
                    Verdict::Dropped(reason) => {
                        debug!("[{ticker}] dropped: {reason}");
                        progress.failure();
                    }
                }
                (ticker, verdict)
            }
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    let survivors = Universe::new(
        verdicts
            .into_iter()
            .filter(|(_, verdict)| verdict.is_kept())
            .map(|(ticker, _)| ticker.clone()),
    );

    let summary = progress.finish();
    info!("filtered down to {} tickers", survivors.len());
    (survivors, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(values: &[f64]) -> Verdict {
        judge(&FundamentalRecord::from_values(values))
    }

    #[test]
    fn positive_non_decreasing_is_kept() {
        assert_eq!(verdict(&[5.0, 6.0, 7.0]), Verdict::Kept);
        assert_eq!(verdict(&[5.0, 5.0, 5.0]), Verdict::Kept);
    }

    #[test]
    fn only_the_latest_three_periods_count() {
        // an old loss falls outside the window
        assert_eq!(verdict(&[-10.0, 1.0, 2.0, 3.0]), Verdict::Kept);
        assert!(!verdict(&[1.0, 2.0, 3.0, 2.5]).is_kept());
    }

    #[test]
    fn decreasing_is_dropped() {
        assert!(!verdict(&[5.0, 4.0, 6.0]).is_kept());
        assert!(!verdict(&[5.0, 6.0, 5.9]).is_kept());
    }

    #[test]
    fn non_positive_is_dropped() {
        assert!(!verdict(&[0.0, 6.0, 7.0]).is_kept());
        assert!(!verdict(&[-1.0, 6.0, 7.0]).is_kept());
        assert!(!verdict(&[f64::NAN, 6.0, 7.0]).is_kept());
    }

    #[test]
    fn short_history_is_dropped() {
        assert!(!verdict(&[6.0, 7.0]).is_kept());
        assert!(!verdict(&[]).is_kept());
    }
}
