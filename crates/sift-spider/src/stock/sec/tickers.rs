use crate::http::*;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, trace};

pub const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
pub const TICKERS_FILE: &str = "company_tickers.json";

lazy_static::lazy_static! {
    /// Listing symbols that SEC files under another ticker.
    pub(crate) static ref ALIASES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("BRK.B", "BRK-B");
        map.insert("BF.B", "BF-B");
        map.insert("GOOGL", "GOOG");
        map.insert("FOXA", "FOX");
        map.insert("NWSA", "NWS");
        map
    };
}

/// Ticker to zero-padded CIK lookup.
#[derive(Clone, Debug, Default)]
pub struct CikMap(HashMap<String, String>);

impl CikMap {
    /// Resolve `ticker`, trying share-class aliases and `.` → `-` when it is not filed as-is.
    pub fn cik(&self, ticker: &str) -> Option<&str> {
        let ticker = ticker.to_uppercase();
        self.0
            .get(&ticker)
            .or_else(|| ALIASES.get(ticker.as_str()).and_then(|alias| self.0.get(*alias)))
            .or_else(|| self.0.get(&ticker.replace('.', "-")))
            .map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Tickers> for CikMap {
    fn from(tickers: Tickers) -> Self {
        // the first entry of a ticker wins; SEC lists the primary filer first
        let mut map = HashMap::with_capacity(tickers.0.len());
        for ticker in tickers.0 {
            map.entry(ticker.ticker.to_uppercase()).or_insert(ticker.cik);
        }
        CikMap(map)
    }
}

/// Load the ticker map from `buffer_dir`, fetching and buffering it on first use.
pub async fn load(client: &HttpClient, buffer_dir: &Path) -> ProviderResult<CikMap> {
    let path = buffer_dir.join(TICKERS_FILE);

    let raw: serde_json::Value = match crate::fs::read_json(&path).await {
        Ok(raw) => {
            trace!("SEC Company Tickers read from buffer");
            raw
        }
        Err(err) => {
            trace!("no buffered SEC Company Tickers ({err}), fetching");
            debug!("fetching SEC Company Tickers");
            let raw: serde_json::Value = crate::get_json(client, TICKERS_URL)
                .await
                .map_err(|err| {
                    error!("failed to fetch SEC Company Tickers, error({err})");
                    err
                })?;
            if let Err(err) = crate::fs::write_json(&path, &raw).await {
                error!("failed to buffer SEC Company Tickers at {}, error({err})", path.display());
            }
            raw
        }
    };

    let tickers: Tickers =
        serde_json::from_value(raw).map_err(|err| ProviderError::Parse(err.to_string()))?;
    let map = CikMap::from(tickers);
    debug!("{} SEC tickers loaded", map.len());
    Ok(map)
}

// de
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub struct Tickers(Vec<Ticker>);

#[derive(Clone, Debug, Deserialize)]
pub struct Ticker {
    #[serde(rename = "cik_str", deserialize_with = "de_cik")]
    cik: String,
    ticker: String,
    #[allow(dead_code)]
    title: String,
}

struct TickerVisitor;

impl<'de> Visitor<'de> for TickerVisitor {
    type Value = Tickers;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("Map of tickers")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        // each entry is in the form of:
        // `0: { "cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc." },
        //  1: { ... },
        //  ...`
        let mut tickers: Vec<Ticker> = Vec::new();
        while let Some((_, ticker)) = map.next_entry::<u32, Ticker>()? {
            tickers.push(ticker);
        }
        Ok(Tickers(tickers))
    }
}

impl<'de> Deserialize<'de> for Tickers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // we want a vector returned, but the deserialize will expect a map, given
        // how the API has been designed
        deserializer.deserialize_map(TickerVisitor)
    }
}

/// CIKs arrive as integers; the API paths want them zero-padded to 10 digits.
fn de_cik<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let cik = u64::deserialize(deserializer)?;
    Ok(format!("{cik:010}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
        "1": {"cik_str": 1067983, "ticker": "BRK-B", "title": "BERKSHIRE HATHAWAY INC"},
        "2": {"cik_str": 1652044, "ticker": "GOOG", "title": "Alphabet Inc."},
        "3": {"cik_str": 1652044, "ticker": "GOOGL", "title": "Alphabet Inc."}
    }"#;

    fn map() -> CikMap {
        CikMap::from(serde_json::from_str::<Tickers>(JSON).unwrap())
    }

    #[test]
    fn ciks_are_zero_padded() {
        assert_eq!(map().cik("AAPL"), Some("0000320193"));
        assert_eq!(map().cik("aapl"), Some("0000320193"));
    }

    #[test]
    fn share_classes_resolve() {
        assert_eq!(map().cik("BRK.B"), Some("0001067983"));
        assert_eq!(map().cik("GOOGL"), Some("0001652044"));
        assert_eq!(map().cik("ZZZZ"), None);
    }

    #[tokio::test]
    async fn buffered_tickers_skip_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let raw: serde_json::Value = serde_json::from_str(JSON).unwrap();
        crate::fs::write_json(&dir.path().join(TICKERS_FILE), &raw)
            .await
            .unwrap();

        // a client that could never reach SEC
        let client = reqwest::Client::new();
        let map = load(&client, dir.path()).await.unwrap();
        assert_eq!(map.len(), 4);
    }
}
