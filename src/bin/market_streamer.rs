//! Market streamer binary: one cooperative polling task per configured
//! trading pair, publishing strictly-newer OHLCV candles onto
//! `raw_market_data`.

use anyhow::Result;
use cryptosent::application::market_streamer::MarketStreamer;
use cryptosent::config::{BrokerConfig, PipelineConfig};
use cryptosent::domain::ports::ExchangeCandleSource;
use cryptosent::infrastructure::broker::AmqpBroker;
use cryptosent::infrastructure::market::BinanceCandleSource;
use cryptosent::infrastructure::observability::Metrics;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::prelude::*;

const BINANCE_BASE_URL: &str = "https://api.binance.com";

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

    info!(pairs = ?pipeline_config.trading_pairs, "market streamer starting");

    let metrics = Arc::new(Metrics::new()?);
    let broker = Arc::new(AmqpBroker::new(&broker_config, metrics.clone()));
    let exchange: Arc<dyn ExchangeCandleSource> = Arc::new(BinanceCandleSource::new(
        BINANCE_BASE_URL,
        pipeline_config.candle_timeframe.clone(),
    ));

    let streamer = MarketStreamer::new(
        exchange,
        broker,
        metrics,
        pipeline_config.trading_pairs.clone(),
        pipeline_config.candle_timeframe.clone(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    streamer.run(shutdown_rx).await
}
