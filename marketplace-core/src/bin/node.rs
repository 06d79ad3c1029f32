//! Marketplace node binary
//!
//! Hosts the ledger actor and keeps it alive until Ctrl-C. Transaction
//! intake and block production live outside this process.

use marketplace_core::{
    spawn_ledger_actor, BlockClock, Config, ManualClock, MarketplaceLedger, Metrics,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("MARKET_CONFIG") {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::from_env()?,
    };

    // Initialize tracing
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting marketplace node"
    );

    let clock = Arc::new(ManualClock::new(config.market.genesis_height));
    let metrics = Metrics::new()?;
    let ledger = MarketplaceLedger::open(&config, clock.clone())?.with_metrics(metrics.clone());

    let (handle, join) = spawn_ledger_actor(ledger, config.actor.mailbox_capacity);

    let counters = handle.counters().await?;
    info!(
        next_item_id = %counters.next_item_id,
        total_volume = counters.total_volume,
        fee = %counters.fee,
        height = clock.current_block_height(),
        "Ledger ready"
    );

    tokio::signal::ctrl_c().await?;

    info!("Shutting down marketplace node");
    handle.shutdown().await?;
    let ledger = join.await?;
    ledger.close()?;

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.registry().gather(), &mut buffer)?;
    info!(metrics = %String::from_utf8_lossy(&buffer), "Final metrics");

    Ok(())
}
