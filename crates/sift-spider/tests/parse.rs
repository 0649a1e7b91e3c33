use chrono::NaiveDate;
use sift_screen::model::{HistoryWindow, Listing};
use sift_screen::ProviderError;
use sift_spider::stock::{wikipedia, yahoo_finance};

fn read(path: &str) -> String {
    std::fs::read_to_string(format!("./tests/files/{path}"))
        .map_err(|err| {
            println!("Unable to open file: {:?}", err);
            err
        })
        .unwrap()
}

fn de<T: serde::de::DeserializeOwned>(path: &str) -> T {
    serde_json::from_str(&read(path)).expect("Unable to deserialize")
}

// wikipedia
// ----------------------------------------------------------
#[test]
fn sp500_first_wikitable_only() {
    let listing: Listing = wikipedia::parse_listing(&read("sp500.html")).unwrap();

    assert_eq!(listing.columns[0], "Symbol");
    assert_eq!(listing.columns.len(), 8);
    assert_eq!(listing.rows.len(), 3);
    assert_eq!(listing.rows[1][0], "AOS");
    assert_eq!(listing.rows[1][1], "A. O. Smith");
    assert_eq!(listing.rows[2][0], "BRK.B");
}

#[test]
fn sp500_listing_builds_a_universe() {
    let listing = wikipedia::parse_listing(&read("sp500.html")).unwrap();
    let universe = sift_screen::universe::from_listing(&listing).unwrap();
    assert_eq!(universe.tickers(), &["MMM", "AOS", "BRK.B"]);
}

#[test]
fn page_without_wikitable_is_a_parse_error() {
    assert!(matches!(
        wikipedia::parse_listing("<html><body><p>maintenance</p></body></html>"),
        Err(ProviderError::Parse(_))
    ));
}

// yahoo finance
// ----------------------------------------------------------
#[test]
fn chart_skips_bars_without_close() {
    let bars = yahoo_finance::prices(de("chart.json")).unwrap();

    assert_eq!(bars.len(), 3);
    assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(bars[0].volume, 82488700.0);
    assert_eq!(bars[2].close, 181.17999267578125);
    assert!(bars.windows(2).all(|pair| pair[0].date < pair[1].date));
}

#[test]
fn thirty_day_window_spans_enough_trading_days() {
    // 45 calendar days to 2025-01-21, over Christmas, New Year, 9 Jan and MLK day
    let bars =
        yahoo_finance::window_prices(de("chart_45d.json"), HistoryWindow::ThirtyDays).unwrap();

    assert!(bars.len() > 20, "only {} bars", bars.len());
    assert!(bars.len() <= 30);
    assert_eq!(bars.first().unwrap().date, NaiveDate::from_ymd_opt(2024, 12, 9).unwrap());
    assert_eq!(bars.last().unwrap().date, NaiveDate::from_ymd_opt(2025, 1, 21).unwrap());

    // the last thirty calendar days alone hold too few bars for a 20-day change
    let cutoff = NaiveDate::from_ymd_opt(2024, 12, 22).unwrap();
    assert!(bars.iter().filter(|bar| bar.date > cutoff).count() <= 20);
}

#[test]
fn share_class_symbols_use_a_dash() {
    assert_eq!(yahoo_finance::symbol("BRK.B"), "BRK-B");
    assert_eq!(yahoo_finance::symbol("bf.b"), "BF-B");
    assert_eq!(yahoo_finance::symbol("AAPL"), "AAPL");
}

#[test]
fn chart_error_is_not_found() {
    let err = yahoo_finance::prices(de("chart_not_found.json")).unwrap_err();
    match err {
        ProviderError::NotFound(reason) => assert!(reason.contains("delisted")),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn key_statistics_are_raw_values() {
    let info = yahoo_finance::key_statistics(de("quote_summary.json")).unwrap();
    assert_eq!(info.short_ratio, Some(1.68));
    assert_eq!(info.short_percent_of_float, Some(0.0066));
    assert_eq!(info.shares_outstanding, Some(15552799744.0));
    assert_eq!(info.float_shares, Some(15535332918.0));
}

#[test]
fn unreported_key_statistics_are_none() {
    let info = yahoo_finance::key_statistics(de("quote_summary_sparse.json")).unwrap();
    assert_eq!(info.shares_outstanding, Some(1000000.0));
    assert_eq!(info.short_ratio, None);
    assert_eq!(info.short_percent_of_float, None);
}

#[test]
fn expiries_are_sorted_nearest_first() {
    let expiries = yahoo_finance::expiries(de("options.json")).unwrap();
    assert_eq!(
        expiries,
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 26).unwrap(),
        ]
    );
}

#[test]
fn chain_keeps_contracts_without_volume() {
    let chain = yahoo_finance::chain(de("options.json")).unwrap();
    assert_eq!(chain.expiry, NaiveDate::from_ymd_opt(2024, 1, 12));
    assert_eq!(chain.calls.len(), 3);
    assert_eq!(chain.calls[2].volume, None);
    assert_eq!(chain.call_volume(), 9861.0);
    assert_eq!(chain.put_volume(), 2210.0);
}
