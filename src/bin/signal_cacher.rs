//! Signal cacher binary: consumes `sentiment_signals_queue` and upserts the
//! latest-per-pair cache record plus a bounded sentiment history list.

use anyhow::Result;
use cryptosent::application::signal_cacher::SignalCacher;
use cryptosent::config::{BrokerConfig, CacheConfig};
use cryptosent::infrastructure::broker::AmqpBroker;
use cryptosent::infrastructure::cache::RedisCache;
use cryptosent::infrastructure::observability::Metrics;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let broker_config = BrokerConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "invalid broker configuration");
        std::process::exit(1);
    });
    let cache_config = CacheConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "invalid cache configuration");
        std::process::exit(1);
    });

    info!("signal cacher starting");

    let metrics = Arc::new(Metrics::new()?);
    let broker = Arc::new(AmqpBroker::new(&broker_config, metrics.clone()));

    // Cache unreachability at boot is fatal: this service has nothing useful
    // to do without it.
    let cache = RedisCache::connect(&cache_config).await.unwrap_or_else(|e| {
        error!(error = %e, "cache unreachable at startup");
        std::process::exit(1);
    });
    let cache = Arc::new(cache);

    let cacher = SignalCacher::new(broker, cache, metrics, cache_config.ttl_seconds);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    cacher.run(shutdown_rx).await
}
