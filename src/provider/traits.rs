//! Data source trait definitions
//!
//! A source is anything that can serve one page of time-series records for a
//! window. The fetch loop depends only on this seam, never on provider
//! identity, so adding a provider means implementing `PageSource` once.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::timeframe::Timeframe;

/// Source error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Delay the source asked us to wait before repeating the request, if
    /// this error is a rate-limit signal.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// One time-series row. The first field is always the timestamp; the
/// remaining fields are positional and labelled by the page's [`Schema`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    /// Timestamp in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Source-specific positional fields (OHLCV columns, metric values, ...)
    pub values: Vec<f64>,
}

impl Record {
    pub fn new(timestamp: i64, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }
}

/// Ordered field names labelling a record's positional fields. Position 0
/// names the timestamp. Some sources only attach a schema to occasional
/// responses, so an empty schema is valid until the first labelled page.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schema(pub Vec<String>);

impl Schema {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// Convenience for static field lists
    pub fn from_fields(fields: &[&str]) -> Self {
        Self(fields.iter().map(|f| f.to_string()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

/// One page of records for a requested window
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    /// Records inside the requested window, any order
    pub records: Vec<Record>,
    /// Field labels, possibly empty until the source reveals them
    pub schema: Schema,
}

impl PageResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A paged time-series data source.
///
/// `fetch_page` must return only records whose timestamps fall inside the
/// window (`start <= ts < end`). A rate-limit condition is reported as
/// [`ProviderError::RateLimited`] with the source-indicated delay, never as
/// an empty page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Source name recorded in stored metadata (e.g. "kucoin", "mock")
    fn name(&self) -> &str;

    /// Fetch one page of records for the given window.
    async fn fetch_page(&self, window: &Timeframe) -> ProviderResult<PageResult>;
}
