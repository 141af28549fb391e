//! Time-series storage
//!
//! A store keeps one time series per key together with synthesized metadata:
//! first/last record timestamps, row count, gap count, created/updated
//! times. `write` replaces a series wholesale, `append` extends one and
//! reconciles the metadata in both directions. Gap counting is nominal: a
//! gap is any consecutive-row delta strictly wider than one interval.

mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interval::Interval;
use crate::provider::{Record, Schema};

/// Storage error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("item already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-item metadata, synthesized on write and reconciled on append
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Name of the source the data came from
    pub source: String,
    /// Nominal spacing of the series
    pub interval: Interval,
    /// Timestamp of the earliest stored record, epoch milliseconds
    pub first_record: i64,
    /// Timestamp of the latest stored record, epoch milliseconds
    pub last_record: i64,
    /// Row count as of the last successful write or append
    pub total_records: u64,
    /// Count of consecutive-row deltas wider than one interval
    pub gaps: u64,
    /// Set once, when the key is first written
    pub created: DateTime<Utc>,
    /// Touched on every write and append
    pub updated: DateTime<Utc>,
}

/// A complete stored series: field labels, rows in ascending timestamp
/// order, and the item's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub schema: Schema,
    pub data: Vec<Record>,
    pub metadata: ItemMetadata,
}

/// Payload for a full write
#[derive(Debug, Clone)]
pub struct WriteItem {
    pub source: String,
    pub interval: Interval,
    pub schema: Schema,
    pub records: Vec<Record>,
}

/// Count temporal gaps in an ascending series: deltas strictly wider than
/// one nominal interval. Exact multiples of the interval are not gaps.
pub fn count_gaps(records: &[Record], interval: Interval) -> u64 {
    let step = interval.duration_ms();
    records
        .windows(2)
        .filter(|pair| pair[1].timestamp - pair[0].timestamp > step)
        .count() as u64
}

/// Key-value time-series storage.
///
/// Keys are opaque identifiers chosen by the caller (e.g. `"BTC-USDT:1d"`).
/// `append` assumes the caller fetched disjoint windows; rows are not
/// deduplicated.
#[async_trait]
pub trait TimeseriesStore: Send + Sync {
    /// Whether a key holds data. `false` for plain absence; an error only
    /// for a real storage failure.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Read a complete stored item. [`StoreError::NotFound`] when absent.
    async fn read(&self, key: &str) -> StoreResult<StoredItem>;

    /// Write a full series, synthesizing its metadata. Records must be
    /// non-empty and ascending. With `overwrite` false an existing key is
    /// refused; when overwriting, the original `created` time survives.
    async fn write(&self, key: &str, item: WriteItem, overwrite: bool) -> StoreResult<ItemMetadata>;

    /// Append records to an existing series and reconcile its metadata:
    /// an earlier minimum lowers `first_record`, a later maximum raises
    /// `last_record`, `total_records` grows by the appended row count, and
    /// the gap count is recomputed over the merged series.
    async fn append(&self, key: &str, records: Vec<Record>) -> StoreResult<ItemMetadata>;
}

pub(crate) fn validate_series(records: &[Record]) -> StoreResult<()> {
    if records.is_empty() {
        return Err(StoreError::InvalidData("empty series".to_string()));
    }
    if records.windows(2).any(|pair| pair[1].timestamp < pair[0].timestamp) {
        return Err(StoreError::InvalidData(
            "records not in ascending timestamp order".to_string(),
        ));
    }
    Ok(())
}
