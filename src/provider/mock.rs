//! Mock data source for testing and development
//!
//! Holds a fixed in-memory candle history and serves whatever slice of it a
//! window asks for. Useful for exercising the fetch loop and the store
//! without network access.

use async_trait::async_trait;

use crate::timeframe::Timeframe;

use super::traits::{PageResult, PageSource, ProviderResult, Record, Schema};

/// Mock source backed by a fixed candle history
pub struct MockSource {
    /// Candles in ascending timestamp order
    candles: Vec<Record>,
    schema: Schema,
    /// When true, the schema is only attached to the first non-empty page
    schema_on_first_page_only: bool,
}

impl MockSource {
    /// Create a source over an explicit record set (sorted internally).
    pub fn new(mut candles: Vec<Record>) -> Self {
        candles.sort_by_key(|r| r.timestamp);
        Self {
            candles,
            schema: Schema::from_fields(&[
                "timestamp", "open", "high", "low", "close", "volume",
            ]),
            schema_on_first_page_only: false,
        }
    }

    /// Generate `days` daily candles, the most recent one ending at
    /// `anchor_ms` (i.e. stamped one day before the anchor), nothing earlier.
    pub fn with_daily_history(days: u32, anchor_ms: i64) -> Self {
        const DAY_MS: i64 = 86_400_000;
        let mut candles = Vec::with_capacity(days as usize);
        for k in (1..=i64::from(days)).rev() {
            let ts = anchor_ms - k * DAY_MS;
            let base = 100.0 + (k % 17) as f64;
            candles.push(Record::new(
                ts,
                vec![base, base + 1.0, base - 1.0, base + 0.5, 1_000.0],
            ));
        }
        Self::new(candles)
    }

    /// Only label the first non-empty page, mimicking sources that attach
    /// schema metadata occasionally.
    pub fn sparse_schema(mut self) -> Self {
        self.schema_on_first_page_only = true;
        self
    }

    fn slice(&self, window: &Timeframe) -> Vec<Record> {
        self.candles
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PageSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_page(&self, window: &Timeframe) -> ProviderResult<PageResult> {
        let records = self.slice(window);
        let is_first_page = self
            .candles
            .last()
            .map(|latest| window.contains(latest.timestamp))
            .unwrap_or(false);
        let schema = if records.is_empty()
            || (self.schema_on_first_page_only && !is_first_page)
        {
            Schema::default()
        } else {
            self.schema.clone()
        };
        Ok(PageResult { records, schema })
    }
}
