use crate::error::{Result, ScreenError};
use crate::model::{Listing, Universe};
use crate::progress::{Stage, StageSummary};
use crate::provider::ListingSource;
use tracing::{debug, error, info, trace};

/// Column names recognised as holding the ticker symbol, compared case-insensitively.
pub const SYMBOL_COLUMNS: [&str; 3] = ["Symbol", "Ticker symbol", "Ticker"];

/// Build the universe from a listing source.
///
/// Never raises: an unreachable or unparseable listing is logged as
/// [`ScreenError::SourceUnavailable`] and an empty universe is returned, which callers treat as
/// "nothing to screen".
pub async fn build(source: &dyn ListingSource, limit: Option<usize>) -> (Universe, StageSummary) {
    let universe = match try_build(source, limit).await {
        Ok(universe) => universe,
        Err(err) => {
            error!("{err}");
            Universe::default()
        }
    };

    let summary = StageSummary {
        stage: Stage::Universe,
        processed: universe.len(),
        succeeded: universe.len(),
    };
    info!("{summary}");
    (universe, summary)
}

/// Build the universe, surfacing [`ScreenError::SourceUnavailable`] to the caller.
pub async fn try_build(source: &dyn ListingSource, limit: Option<usize>) -> Result<Universe> {
    debug!("fetching listing from {}", source.name());
    let listing = source
        .listing()
        .await
        .map_err(|err| ScreenError::source_unavailable(source.name(), err))?;

    let universe = from_listing(&listing)
        .map_err(|reason| ScreenError::source_unavailable(source.name(), reason))?;
    info!(
        "{} unique tickers listed by {}",
        universe.len(),
        source.name()
    );

    Ok(match limit {
        Some(k) => {
            trace!("truncating universe to the first {k} tickers");
            universe.truncated(k)
        }
        None => universe,
    })
}

/// Extract the symbol column of a listing into a universe.
pub fn from_listing(listing: &Listing) -> std::result::Result<Universe, String> {
    let col = symbol_column(&listing.columns).ok_or_else(|| {
        format!(
            "no ticker column found, expected one of {SYMBOL_COLUMNS:?}, got {:?}",
            listing.columns
        )
    })?;

    let symbols = listing
        .rows
        .iter()
        .filter_map(|row| row.get(col))
        .map(|symbol| symbol.trim().to_uppercase())
        .filter(|symbol| !symbol.is_empty());

    Ok(Universe::new(symbols))
}

fn symbol_column(columns: &[String]) -> Option<usize> {
    SYMBOL_COLUMNS.iter().find_map(|name| {
        columns
            .iter()
            .position(|col| col.trim().eq_ignore_ascii_case(name))
    })
}
