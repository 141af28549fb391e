//! Historical market-data backfill
//!
//! Pulls time-series history (OHLCV candles, market metrics) from paginated,
//! rate-limited sources into a local key-value store, extending existing
//! series incrementally and tracking temporal gaps.
//!
//! The pieces:
//! - [`interval`] / [`timeframe`]: granularities and window arithmetic
//! - [`provider`]: the `PageSource` seam and its implementations
//! - [`fetch`]: the backward-walking fetch loop with retry and skip budgets
//! - [`store`]: the time-series store with metadata synthesis
//! - [`backfill`]: per-key fresh-vs-incremental orchestration

pub mod backfill;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod interval;
pub mod provider;
pub mod store;
pub mod timeframe;

pub use interval::Interval;
pub use timeframe::Timeframe;
