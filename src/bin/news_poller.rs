//! News poller binary: periodically pulls the closed feed roster, dedups
//! and filters for crypto relevance, and publishes onto `raw_news_data`.
//!
//! # Environment Variables
//! See `BrokerConfig` and `PipelineConfig` for the full list; at minimum
//! `BROKER_PASS` must be set.

use anyhow::Result;
use cryptosent::application::news_poller::NewsPoller;
use cryptosent::config::{BrokerConfig, PipelineConfig};
use cryptosent::domain::feed_roster::FEED_ROSTER;
use cryptosent::domain::ports::NewsFeedSource;
use cryptosent::infrastructure::broker::AmqpBroker;
use cryptosent::infrastructure::news::RssFeedSource;
use cryptosent::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::Duration;
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
    let pipeline_config = PipelineConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "invalid pipeline configuration");
        std::process::exit(1);
    });

    info!("news poller starting");

    let metrics = Arc::new(Metrics::new()?);
    let broker = Arc::new(AmqpBroker::new(&broker_config, metrics.clone()));
    let feeds: Vec<Arc<dyn NewsFeedSource>> = FEED_ROSTER
        .iter()
        .map(|spec| Arc::new(RssFeedSource::new(spec.source_name, spec.feed_url)) as Arc<dyn NewsFeedSource>)
        .collect();

    let mut poller = NewsPoller::new(
        feeds,
        broker,
        metrics,
        Duration::from_secs(pipeline_config.news_poll_interval_secs),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    poller.run(shutdown_rx).await
}
