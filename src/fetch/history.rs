//! Windowed backward-pagination fetch loop
//!
//! Pulls the complete available history (or the maximal available slice)
//! from a paginated, rate-limited source by walking backward through time
//! windows. Two independent budgets bound the walk:
//!
//! - the **retry budget** covers transient rate-limit errors: sleep for the
//!   source-indicated delay and repeat the same window;
//! - the **period-skip budget** covers legitimately empty windows: advance
//!   past them, because "no data for this slice" is not a failure until it
//!   repeats enough times to look like the start of history.
//!
//! Any successful page resets both budgets, so a walk alternating between
//! dense and sparse periods does not exhaust prematurely. Collapsing the two
//! budgets would either lose valid older history behind one empty page or
//! retry forever against a hard end-of-history boundary.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::interval::Interval;
use crate::provider::{PageSource, ProviderError, ProviderResult, Record, Schema};
use crate::timeframe::Timeframe;

/// Default budget for rate-limit retries on a single window
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;

/// Default budget for consecutive empty windows before giving up
pub const DEFAULT_PERIOD_SKIPS: u32 = 2;

/// Retry and period-skip budgets for a fetch session
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// Rate-limit retries allowed per window before falling back
    pub max_retry_attempts: u32,
    /// Empty windows tolerated in a row before terminating
    pub max_period_skips: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            max_period_skips: DEFAULT_PERIOD_SKIPS,
        }
    }
}

/// One history fetch request.
///
/// The walk is anchored at `before` when set, otherwise at the current
/// instant; the first window fetched is the most recent complete window
/// before the anchor. `after` is a floor: the walk terminates once the
/// current window ends at or before it, which is what lets a caller fill
/// forward from known data without re-walking everything older.
#[derive(Debug, Clone, Copy)]
pub struct HistoryRequest {
    pub interval: Interval,
    /// Window size in intervals (the API's page-size equivalent)
    pub size: u32,
    /// Upper anchor in epoch milliseconds; defaults to "now"
    pub before: Option<i64>,
    /// Lower bound in epoch milliseconds; windows at or below it are not fetched
    pub after: Option<i64>,
}

impl HistoryRequest {
    pub fn new(interval: Interval, size: u32) -> Self {
        Self {
            interval,
            size,
            before: None,
            after: None,
        }
    }

    /// Anchor the walk just before `timestamp_ms` instead of now.
    pub fn before(mut self, timestamp_ms: i64) -> Self {
        self.before = Some(timestamp_ms);
        self
    }

    /// Stop the walk once windows reach back to `timestamp_ms`.
    pub fn after(mut self, timestamp_ms: i64) -> Self {
        self.after = Some(timestamp_ms);
        self
    }
}

/// Everything a fetch session accumulated
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Records in reverse-chronological arrival order: pages newest-first,
    /// each page internally ascending. Use [`FetchOutcome::into_sorted_records`]
    /// for chronological order.
    pub records: Vec<Record>,
    /// First non-empty schema observed during the session
    pub schema: Schema,
    /// Pages that contributed records
    pub pages_fetched: u32,
    /// Empty windows walked past
    pub periods_skipped: u32,
    /// Rate-limit retries performed
    pub retries_used: u32,
    /// True when the session ended on a shutdown signal
    pub cancelled: bool,
}

impl FetchOutcome {
    /// All records in ascending timestamp order.
    pub fn into_sorted_records(mut self) -> Vec<Record> {
        self.records.sort_by_key(|r| r.timestamp);
        self.records
    }
}

/// Drives repeated page fetches across backward-stepping windows.
pub struct HistoryFetcher<P: PageSource + ?Sized> {
    source: Arc<P>,
    policy: FetchPolicy,
}

impl<P: PageSource + ?Sized> HistoryFetcher<P> {
    pub fn new(source: Arc<P>) -> Self {
        Self {
            source,
            policy: FetchPolicy::default(),
        }
    }

    pub fn with_policy(source: Arc<P>, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch history as far back as the source allows, within budget.
    ///
    /// Budget exhaustion is normal termination, not an error: whatever was
    /// accumulated is returned. Rate limiting is retried against the same
    /// window while retry budget remains; once it runs out, remaining
    /// period-skip budget is spent instead, and only then does the walk end.
    /// Any other source error aborts the session for this request.
    pub async fn fetch_available_history(
        &self,
        request: &HistoryRequest,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> ProviderResult<FetchOutcome> {
        let anchor = request
            .before
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let mut window = Timeframe::ending_before(request.interval, request.size, anchor);

        let mut retries_remaining = self.policy.max_retry_attempts;
        let mut skips_remaining = self.policy.max_period_skips;
        let mut outcome = FetchOutcome::default();

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!(source = self.source.name(), "fetch cancelled");
                outcome.cancelled = true;
                break;
            }
            if let Some(floor) = request.after {
                if window.end_ms() <= floor {
                    debug!(floor, "reached lower bound, stopping walk");
                    break;
                }
            }

            match self.source.fetch_page(&window).await {
                Ok(page) if page.records.len() > 1 => {
                    if outcome.schema.is_empty() && !page.schema.is_empty() {
                        outcome.schema = page.schema;
                    }
                    let mut records = page.records;
                    records.sort_by_key(|r| r.timestamp);
                    debug!(
                        count = records.len(),
                        window_start = window.start_ms(),
                        window_end = window.end_ms(),
                        "page fetched"
                    );
                    outcome.records.extend(records);
                    outcome.pages_fetched += 1;
                    // a success forgives prior failures
                    retries_remaining = self.policy.max_retry_attempts;
                    skips_remaining = self.policy.max_period_skips;
                    window = window.prev();
                }
                Ok(_) if skips_remaining > 0 => {
                    skips_remaining -= 1;
                    outcome.periods_skipped += 1;
                    debug!(
                        window_start = window.start_ms(),
                        remaining = skips_remaining,
                        "empty window, skipping back"
                    );
                    window = window.prev();
                }
                Ok(_) => {
                    debug!("period-skip budget exhausted, ending walk");
                    break;
                }
                Err(ProviderError::RateLimited { retry_after }) if retries_remaining > 0 => {
                    retries_remaining -= 1;
                    outcome.retries_used += 1;
                    warn!(
                        ?retry_after,
                        remaining = retries_remaining,
                        "rate limited, backing off"
                    );
                    tokio::select! {
                        _ = sleep(retry_after) => {}
                        _ = shutdown_rx.recv() => {
                            outcome.cancelled = true;
                            break;
                        }
                    }
                    // repeat the same window
                }
                Err(ProviderError::RateLimited { .. }) if skips_remaining > 0 => {
                    // retry budget gone; spend skip budget before giving up
                    skips_remaining -= 1;
                    outcome.periods_skipped += 1;
                    window = window.prev();
                }
                Err(ProviderError::RateLimited { .. }) => {
                    warn!("rate limited with all budgets exhausted, ending walk");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            source = self.source.name(),
            records = outcome.records.len(),
            pages = outcome.pages_fetched,
            skipped = outcome.periods_skipped,
            retries = outcome.retries_used,
            "fetch session finished"
        );
        Ok(outcome)
    }
}
