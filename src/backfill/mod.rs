//! Backfill runs
//!
//! Decides per key between a first-time full fetch and a staleness-gated
//! incremental update, and reports what happened to every key.

mod orchestrator;

pub use orchestrator::{
    BackfillError, BackfillItem, BackfillOrchestrator, BackfillSummary, KeyAction, KeyOutcome,
    OrchestratorSettings, DEFAULT_STALENESS_MINUTES,
};
