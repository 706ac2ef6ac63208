//! Strategy join binary: consumes `raw_market_data`, maintains per-pair
//! technical indicator state, joins it against the cached sentiment signal,
//! and publishes the resulting entry/exit decision snapshot to
//! `strategy_state:{pair}` for an external monitor or strategy host.

use anyhow::Result;
use cryptosent::application::strategy_join::{StrategyJoin, StrategyJoinConfig};
use cryptosent::config::{BrokerConfig, CacheConfig, PipelineConfig};
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
    let pipeline_config = PipelineConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "invalid pipeline configuration");
        std::process::exit(1);
    });

    info!("strategy join starting");

    let metrics = Arc::new(Metrics::new()?);
    let broker = Arc::new(AmqpBroker::new(&broker_config, metrics.clone()));
    let cache = RedisCache::connect(&cache_config).await.unwrap_or_else(|e| {
        error!(error = %e, "cache unreachable at startup");
        std::process::exit(1);
    });
    let cache = Arc::new(cache);

    let join_config = StrategyJoinConfig {
        sentiment_buy_threshold: pipeline_config.sentiment_buy_threshold,
        sentiment_sell_threshold: pipeline_config.sentiment_sell_threshold,
        sentiment_stale_hours: pipeline_config.sentiment_stale_hours,
    };

    let join = StrategyJoin::new(broker, cache, metrics, join_config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    join.run(shutdown_rx).await
}
