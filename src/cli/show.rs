//! Show command
//!
//! Prints a stored item's metadata and, on request, its most recent rows.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Args;

use crate::config::Settings;
use crate::store::{LocalStore, TimeseriesStore};

/// Arguments for the show command
#[derive(Args)]
pub struct ShowArgs {
    /// Store key, e.g. "BTC-USDT:1d"
    pub key: String,

    /// Config file path (defaults to config/default.toml if present)
    #[arg(long, short)]
    pub config: Option<String>,

    /// Also print the most recent rows
    #[arg(long, short)]
    pub data: bool,

    /// How many rows to print with --data
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

fn format_ms(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.to_rfc3339(),
        None => timestamp_ms.to_string(),
    }
}

pub async fn execute(args: ShowArgs) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;
    let store = LocalStore::open(settings.store.data_dir).await?;

    let item = store.read(&args.key).await?;
    let meta = &item.metadata;

    println!("key:           {}", args.key);
    println!("source:        {}", meta.source);
    println!("interval:      {}", meta.interval);
    println!("first record:  {}", format_ms(meta.first_record));
    println!("last record:   {}", format_ms(meta.last_record));
    println!("total records: {}", meta.total_records);
    println!("gaps:          {}", meta.gaps);
    println!("created:       {}", meta.created.to_rfc3339());
    println!("updated:       {}", meta.updated.to_rfc3339());

    if args.data {
        println!();
        println!("{}", item.schema.fields().join("  "));
        let start = item.data.len().saturating_sub(args.limit);
        for record in &item.data[start..] {
            let values: Vec<String> = record.values.iter().map(|v| v.to_string()).collect();
            println!("{}  {}", format_ms(record.timestamp), values.join("  "));
        }
    }
    Ok(())
}
