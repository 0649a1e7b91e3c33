use crate::http::*;
use async_trait::async_trait;
use sift_screen::model::Listing;
use sift_screen::provider::ListingSource;
use std::path::PathBuf;
use tracing::debug;

/// A local CSV file with a header row, one company per row.
pub struct CsvListing {
    path: PathBuf,
    name: String,
}

impl CsvListing {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl ListingSource for CsvListing {
    fn name(&self) -> &str {
        &self.name
    }

    async fn listing(&self) -> ProviderResult<Listing> {
        debug!("reading listing from {}", self.path.display());
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
            ProviderError::Unavailable(format!("{}, {err}", self.path.display()))
        })?;
        parse_listing(&bytes)
    }
}

/// Parse CSV bytes with a header row into a [`Listing`].
pub fn parse_listing(bytes: &[u8]) -> ProviderResult<Listing> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let columns = reader
        .headers()
        .map_err(|err| ProviderError::Parse(err.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = reader
        .records()
        .map(|record| {
            record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(|err| ProviderError::Parse(err.to_string()))
        })
        .collect::<ProviderResult<Vec<Vec<String>>>>()?;

    Ok(Listing { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows_are_parsed() {
        let listing = parse_listing(b"Symbol,Security\nMMM, 3M\nAOS,A. O. Smith\n").unwrap();
        assert_eq!(listing.columns, vec!["Symbol", "Security"]);
        assert_eq!(listing.rows[0], vec!["MMM", "3M"]);
        assert_eq!(listing.rows.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let source = CsvListing::new("./does/not/exist.csv");
        assert!(matches!(
            source.listing().await,
            Err(ProviderError::Unavailable(_))
        ));
    }
}
