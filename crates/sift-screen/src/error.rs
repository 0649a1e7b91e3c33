use thiserror::Error;

/// The stage-level error taxonomy of the screening pipeline.
///
/// `PerTickerFailure` never escapes a ticker boundary; stages log it and carry on. The other
/// variants are raised at the stage level.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// A listing or benchmark source could not be reached or parsed.
    #[error("source unavailable: {source_name}, error({reason})")]
    SourceUnavailable { source_name: String, reason: String },

    /// A single ticker failed to fetch or parse.
    #[error("[{ticker}] failed, error({reason})")]
    PerTickerFailure { ticker: String, reason: String },

    /// Invalid configuration; raised before any work begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stage could not read its input snapshot (or write its output).
    #[error("snapshot error at {path}: {reason}")]
    Snapshot { path: String, reason: String },
}

impl ScreenError {
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn per_ticker(ticker: impl Into<String>, reason: impl ToString) -> Self {
        Self::PerTickerFailure {
            ticker: ticker.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by data providers (HTTP endpoints, local files).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ScreenError>;
