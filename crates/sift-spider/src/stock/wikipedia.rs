use crate::http::*;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use sift_screen::model::Listing;
use sift_screen::provider::ListingSource;
use tracing::{debug, trace};

pub const SP500_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// The first `wikitable` on the S&P 500 constituents page.
pub struct Sp500Listing {
    client: HttpClient,
    url: String,
}

impl Sp500Listing {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            url: SP500_URL.to_string(),
        }
    }
}

#[async_trait]
impl ListingSource for Sp500Listing {
    fn name(&self) -> &str {
        "Wikipedia S&P 500"
    }

    async fn listing(&self) -> ProviderResult<Listing> {
        debug!("fetching S&P 500 constituents from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|err| ProviderError::Parse(err.to_string()))?;
        parse_listing(&html)
    }
}

/// Parse the first `table.wikitable` of `html` into a [`Listing`].
pub fn parse_listing(html: &str) -> ProviderResult<Listing> {
    let document = Html::parse_document(html);
    let table_selector = selector("table.wikitable")?;
    let row_selector = selector("tr")?;
    let header_selector = selector("th")?;
    let cell_selector = selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| ProviderError::Parse("no wikitable found".to_string()))?;

    let mut rows = table.select(&row_selector);
    let columns: Vec<String> = rows
        .next()
        .map(|row| row.select(&header_selector).map(text).collect())
        .unwrap_or_default();
    if columns.is_empty() {
        return Err(ProviderError::Parse("wikitable has no header row".to_string()));
    }

    let rows: Vec<Vec<String>> = rows
        .map(|row| row.select(&cell_selector).map(text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();
    trace!("{} columns, {} rows parsed", columns.len(), rows.len());

    Ok(Listing { columns, rows })
}

fn selector(css: &str) -> ProviderResult<Selector> {
    Selector::parse(css).map_err(|err| ProviderError::Parse(format!("selector {css}, {err}")))
}

fn text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}
