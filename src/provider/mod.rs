//! Data source layer
//!
//! Defines the `PageSource` seam the fetch loop depends on, plus the
//! available implementations: KuCoin REST candles and an in-memory mock.

mod kucoin;
mod mock;
mod traits;

pub use kucoin::{KucoinSettings, KucoinSource};
pub use mock::MockSource;
pub use traits::{PageResult, PageSource, ProviderError, ProviderResult, Record, Schema};
