//! Backfill command
//!
//! Builds one source per configured symbol, runs the orchestrator over them
//! and reports the per-key outcome. Ctrl-C requests a clean stop: the
//! current fetch winds down and whatever was already stored stays stored.

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::backfill::{BackfillItem, BackfillOrchestrator, OrchestratorSettings};
use crate::config::Settings;
use crate::interval::Interval;
use crate::provider::{KucoinSettings, KucoinSource};
use crate::store::LocalStore;

/// Arguments for the backfill command
#[derive(Args)]
pub struct BackfillArgs {
    /// Config file path (defaults to config/default.toml if present)
    #[arg(long, short)]
    pub config: Option<String>,

    /// Symbols to backfill (comma-separated), overriding the config
    #[arg(long, short, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Interval to backfill, overriding the config (e.g. 1m, 4h, 1d)
    #[arg(long, short)]
    pub interval: Option<Interval>,

    /// Refresh every key regardless of staleness
    #[arg(long)]
    pub force: bool,
}

pub async fn execute(args: BackfillArgs) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;

    let symbols = if args.symbols.is_empty() {
        settings.backfill.symbols.clone()
    } else {
        args.symbols.clone()
    };
    let interval = args.interval.unwrap_or(settings.backfill.interval);

    let store = Arc::new(LocalStore::open(settings.store.data_dir.clone()).await?);

    let http_client = reqwest::Client::new();
    let items: Vec<BackfillItem> = symbols
        .iter()
        .map(|symbol| BackfillItem {
            key: format!("{}:{}", symbol, interval),
            interval,
            window_size: settings.fetch.window_size,
            source: Arc::new(KucoinSource::new(
                http_client.clone(),
                KucoinSettings::new(symbol.clone())
                    .with_base_url(settings.source.base_url.clone()),
            )),
        })
        .collect();

    let orchestrator_settings = OrchestratorSettings {
        staleness_minutes: if args.force {
            0
        } else {
            settings.backfill.staleness_minutes
        },
        policy: settings.fetch_policy(),
    };

    let (shutdown_tx, _) = broadcast::channel(1);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current fetch");
            let _ = signal_tx.send(());
        }
    });

    let orchestrator = BackfillOrchestrator::new(store, orchestrator_settings, shutdown_tx);
    info!(keys = items.len(), %interval, "starting backfill run");
    let summary = orchestrator.run(&items).await;

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(action) => println!("{}: {:?}", outcome.key, action),
            Err(e) => println!("{}: failed: {}", outcome.key, e),
        }
    }
    if summary.failed() > 0 && summary.failed() == summary.outcomes.len() {
        anyhow::bail!("every key failed");
    }
    Ok(())
}
