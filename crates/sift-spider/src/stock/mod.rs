/// Local CSV files as a listing source.
pub mod csv_listing;

/// US stock information from the [SEC]; ticker to CIK mapping and annual net income from the
/// company facts API.
///
/// [SEC]: https://www.sec.gov/search-filings/edgar-application-programming-interfaces
pub mod sec;

/// The S&P 500 constituents table from Wikipedia.
pub mod wikipedia;

/// Prices, key statistics and option chains from the Yahoo Finance API; inspiration from
/// Python's [yfinance] library.
///
/// [yfinance]: https://github.com/ranaroussi/yfinance/
pub mod yahoo_finance;

pub use csv_listing::CsvListing;
pub use sec::SecFundamentals;
pub use wikipedia::Sp500Listing;
pub use yahoo_finance::YahooFinance;
