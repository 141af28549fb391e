//! Command-line interface
//!
//! Thin glue over the library: argument parsing and wiring only.

pub mod backfill;
pub mod show;

use clap::{Parser, Subcommand};

/// Market backfill CLI
#[derive(Parser)]
#[command(name = "market-backfill")]
#[command(about = "Backfill historical market data into a local time-series store")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a backfill over the configured symbols
    Backfill(backfill::BackfillArgs),
    /// Show a stored series and its metadata
    Show(show::ShowArgs),
}
