//! History acquisition
//!
//! The fetch loop that walks backward through time windows against a
//! [`crate::provider::PageSource`], with retry and period-skip budgets.

mod history;

pub use history::{
    FetchOutcome, FetchPolicy, HistoryFetcher, HistoryRequest, DEFAULT_PERIOD_SKIPS,
    DEFAULT_RETRY_ATTEMPTS,
};
