//! Market backfill CLI
//!
//! Commands:
//! - `backfill`: bring every configured series up to date
//! - `show`: inspect a stored series

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_backfill::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("market_backfill=info".parse()?))
        .init();

    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backfill(args) => {
            market_backfill::cli::backfill::execute(args).await?;
        }
        Commands::Show(args) => {
            market_backfill::cli::show::execute(args).await?;
        }
    }

    Ok(())
}
