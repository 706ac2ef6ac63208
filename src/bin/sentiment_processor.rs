//! Sentiment processor binary: consumes `raw_news_data`, scores each article
//! through the oracle cascade, classifies and pair-matches, and publishes
//! onto `sentiment_signals_queue`.

use anyhow::Result;
use cryptosent::application::sentiment_processor::SentimentProcessor;
use cryptosent::config::{BrokerConfig, OracleConfig, PipelineConfig};
use cryptosent::domain::pair::default_pair_keywords;
use cryptosent::domain::ports::SentimentOracle;
use cryptosent::infrastructure::broker::AmqpBroker;
use cryptosent::infrastructure::observability::Metrics;
use cryptosent::infrastructure::oracle::{HttpOracle, KeywordOracle, OracleCascade};
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
    let oracle_config = OracleConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "invalid oracle configuration");
        std::process::exit(1);
    });
    let pipeline_config = PipelineConfig::from_env().unwrap_or_else(|e| {
        error!(error = %e, "invalid pipeline configuration");
        std::process::exit(1);
    });

    info!("sentiment processor starting");

    let metrics = Arc::new(Metrics::new()?);
    let broker = Arc::new(AmqpBroker::new(&broker_config, metrics.clone()));

    let primary: Arc<dyn SentimentOracle> = Arc::new(HttpOracle::new(&oracle_config));
    let secondary: Arc<dyn SentimentOracle> = Arc::new(KeywordOracle);
    let cascade = Arc::new(OracleCascade::new(primary, secondary));

    let configured_pairs: std::collections::HashSet<String> = pipeline_config.trading_pairs.iter().cloned().collect();
    let pair_keywords: std::collections::HashMap<String, Vec<String>> = default_pair_keywords()
        .into_iter()
        .filter(|(pair, _)| configured_pairs.contains(pair))
        .collect();

    let processor = SentimentProcessor::new(
        broker,
        cascade,
        metrics,
        pair_keywords,
        pipeline_config.general_crypto_fanout_enabled,
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    processor.run(shutdown_rx).await
}
