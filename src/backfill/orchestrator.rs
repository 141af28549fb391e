//! Backfill orchestration
//!
//! Walks a list of keys and brings each one's stored series up to date. An
//! absent key gets a full-history fetch; a present key is left alone until
//! its metadata goes stale, then filled incrementally in both directions:
//! backward from the oldest stored record and forward from the newest one.
//! A failing key is logged and skipped, never aborting the rest of the run.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::fetch::{FetchPolicy, HistoryFetcher, HistoryRequest};
use crate::interval::Interval;
use crate::provider::{PageSource, ProviderError};
use crate::store::{StoreError, TimeseriesStore, WriteItem};

/// Minutes a series may go without an update before it is refreshed
pub const DEFAULT_STALENESS_MINUTES: i64 = 60;

/// Errors a single key can fail with
#[derive(Error, Debug)]
pub enum BackfillError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One key to keep backfilled, with its paging parameters and source
pub struct BackfillItem {
    /// Store key, e.g. "BTC-USDT:1d"
    pub key: String,
    pub interval: Interval,
    /// Window size in intervals per page request
    pub window_size: u32,
    pub source: Arc<dyn PageSource>,
}

/// What happened to one key during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Nothing to do: fresh enough, or the source had no usable history
    Skipped,
    /// First-time full write
    Written { records: u64, gaps: u64 },
    /// Incremental update in either direction
    Appended { backward: u64, forward: u64 },
    /// Shutdown arrived mid-fetch
    Cancelled,
}

/// Per-key result of a run
pub struct KeyOutcome {
    pub key: String,
    pub result: Result<KeyAction, BackfillError>,
}

/// Everything a run did, per key
#[derive(Default)]
pub struct BackfillSummary {
    pub outcomes: Vec<KeyOutcome>,
}

impl BackfillSummary {
    pub fn written(&self) -> usize {
        self.count(|a| matches!(a, KeyAction::Written { .. }))
    }

    pub fn appended(&self) -> usize {
        self.count(|a| matches!(a, KeyAction::Appended { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, KeyAction::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    fn count(&self, pred: impl Fn(&KeyAction) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(a) if pred(a)))
            .count()
    }
}

/// Orchestrator tuning
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub staleness_minutes: i64,
    pub policy: FetchPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            staleness_minutes: DEFAULT_STALENESS_MINUTES,
            policy: FetchPolicy::default(),
        }
    }
}

/// Drives full and incremental backfills over a store.
pub struct BackfillOrchestrator<S: TimeseriesStore> {
    store: Arc<S>,
    settings: OrchestratorSettings,
    shutdown: broadcast::Sender<()>,
}

impl<S: TimeseriesStore> BackfillOrchestrator<S> {
    pub fn new(store: Arc<S>, settings: OrchestratorSettings, shutdown: broadcast::Sender<()>) -> Self {
        Self {
            store,
            settings,
            shutdown,
        }
    }

    /// Process every item in order. Per-key failures are recorded, not
    /// propagated; only a shutdown signal ends the run early.
    pub async fn run(&self, items: &[BackfillItem]) -> BackfillSummary {
        let mut summary = BackfillSummary::default();
        for item in items {
            let result = self.process_item(item).await;
            match &result {
                Ok(KeyAction::Cancelled) => {
                    info!(key = %item.key, "run cancelled");
                    summary.outcomes.push(KeyOutcome {
                        key: item.key.clone(),
                        result,
                    });
                    break;
                }
                Ok(action) => info!(key = %item.key, ?action, "key processed"),
                Err(e) => error!(key = %item.key, error = %e, "key failed, continuing"),
            }
            summary.outcomes.push(KeyOutcome {
                key: item.key.clone(),
                result,
            });
        }
        info!(
            keys = summary.outcomes.len(),
            written = summary.written(),
            appended = summary.appended(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "backfill run finished"
        );
        summary
    }

    async fn process_item(&self, item: &BackfillItem) -> Result<KeyAction, BackfillError> {
        if self.store.exists(&item.key).await? {
            self.update_existing(item).await
        } else {
            self.populate_fresh(item).await
        }
    }

    /// Full-history fetch for a key the store has never seen.
    async fn populate_fresh(&self, item: &BackfillItem) -> Result<KeyAction, BackfillError> {
        let fetcher = HistoryFetcher::with_policy(item.source.clone(), self.settings.policy);
        let request = HistoryRequest::new(item.interval, item.window_size);
        let outcome = fetcher
            .fetch_available_history(&request, self.shutdown.subscribe())
            .await?;
        if outcome.cancelled {
            return Ok(KeyAction::Cancelled);
        }
        // a lone record is not history worth recording
        if outcome.records.len() <= 1 {
            warn!(key = %item.key, "source returned no usable history");
            return Ok(KeyAction::Skipped);
        }

        let schema = outcome.schema.clone();
        let records = outcome.into_sorted_records();
        let metadata = self
            .store
            .write(
                &item.key,
                WriteItem {
                    source: item.source.name().to_string(),
                    interval: item.interval,
                    schema,
                    records,
                },
                true,
            )
            .await?;
        if metadata.gaps > 0 {
            warn!(key = %item.key, gaps = metadata.gaps, "stored series has temporal gaps");
        }
        Ok(KeyAction::Written {
            records: metadata.total_records,
            gaps: metadata.gaps,
        })
    }

    /// Staleness-gated dual-direction incremental fill.
    async fn update_existing(&self, item: &BackfillItem) -> Result<KeyAction, BackfillError> {
        let stored = self.store.read(&item.key).await?;
        let age = Utc::now() - stored.metadata.updated;
        if age <= ChronoDuration::minutes(self.settings.staleness_minutes) {
            return Ok(KeyAction::Skipped);
        }

        let fetcher = HistoryFetcher::with_policy(item.source.clone(), self.settings.policy);

        // older history, anchored just before the earliest stored record
        let backward_request =
            HistoryRequest::new(item.interval, item.window_size).before(stored.metadata.first_record);
        let backward = fetcher
            .fetch_available_history(&backward_request, self.shutdown.subscribe())
            .await?;
        if backward.cancelled {
            return Ok(KeyAction::Cancelled);
        }
        let mut appended_backward = 0u64;
        if !backward.records.is_empty() {
            appended_backward = backward.records.len() as u64;
            self.store
                .append(&item.key, backward.into_sorted_records())
                .await?;
        }

        // newer history, anchored at now and floored at the latest stored
        // record so the walk does not revisit what we already hold
        let forward_request =
            HistoryRequest::new(item.interval, item.window_size).after(stored.metadata.last_record);
        let forward = fetcher
            .fetch_available_history(&forward_request, self.shutdown.subscribe())
            .await?;
        if forward.cancelled {
            return Ok(KeyAction::Cancelled);
        }
        // the window straddling last_record overlaps stored rows
        let last_record = stored.metadata.last_record;
        let fresh: Vec<_> = forward
            .into_sorted_records()
            .into_iter()
            .filter(|r| r.timestamp > last_record)
            .collect();
        let mut appended_forward = 0u64;
        if !fresh.is_empty() {
            appended_forward = fresh.len() as u64;
            self.store.append(&item.key, fresh).await?;
        }

        Ok(KeyAction::Appended {
            backward: appended_backward,
            forward: appended_forward,
        })
    }
}
