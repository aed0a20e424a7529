//! Folio admin command line.
//!
//! Usage:
//!   folio-admin --url https://xyz.supabase.co --api-key KEY blog list
//!   folio-admin skills create '{"name":"Rust","category":"Languages","level":90}'
//!
//! `FOLIO_URL` and `FOLIO_API_KEY` may be set instead of the flags.

use anyhow::{Context, Result};
use clap::Parser;
use folio_admin::{run, Cli};
use folio_store::{RestConfig, RestStore};
use folio_sync::{Portfolio, SyncConfig};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let store = RestStore::new(RestConfig {
        base_url: cli.url.clone(),
        api_key: cli.api_key.clone(),
        timeout_secs: cli.timeout,
        ..Default::default()
    })
    .context("failed to build REST client")?;
    info!("Using backend at {}", cli.url);

    let portfolio = Portfolio::init(Arc::new(store), SyncConfig::default());
    let mut stdout = std::io::stdout().lock();
    let result = run(&portfolio, cli.entity, cli.command, &mut stdout).await;
    portfolio.teardown();
    result
}
