//! Market streamer orchestration (§4.E): one cooperative task per configured
//! pair, each polling a shared exchange connection for new candles and
//! publishing strictly-newer ones. `last_published` is owned per-task, never
//! shared global state (§9 redesign note).

use crate::domain::entities::Candle;
use crate::domain::ports::{ExchangeCandleSource, MessageBroker, QueueArgs};
use crate::infrastructure::broker::AmqpBroker;
use crate::infrastructure::observability::Metrics;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const RAW_MARKET_DATA_QUEUE: &str = "raw_market_data";

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct MarketStreamer {
    exchange: Arc<dyn ExchangeCandleSource>,
    broker: Arc<AmqpBroker>,
    metrics: Arc<Metrics>,
    pairs: Vec<String>,
    timeframe: String,
}

impl MarketStreamer {
    pub fn new(
        exchange: Arc<dyn ExchangeCandleSource>,
        broker: Arc<AmqpBroker>,
        metrics: Arc<Metrics>,
        pairs: Vec<String>,
        timeframe: String,
    ) -> Self {
        Self {
            exchange,
            broker,
            metrics,
            pairs,
            timeframe,
        }
    }

    /// Spawns one task per pair and waits for all of them to exit (either
    /// on cancellation or on an unrecoverable error).
    pub async fn run(&self, shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        self.broker.ensure_connection().await?;
        self.broker
            .declare_queue(RAW_MARKET_DATA_QUEUE, true, QueueArgs::default())
            .await?;

        let mut handles = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            let exchange = self.exchange.clone();
            let broker = self.broker.clone();
            let metrics = self.metrics.clone();
            let pair = pair.clone();
            let timeframe = self.timeframe.clone();
            let mut shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                run_pair_task(exchange, broker, metrics, pair, timeframe, &mut shutdown).await
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "per-pair streaming task panicked");
            }
        }
        Ok(())
    }
}

async fn run_pair_task(
    exchange: Arc<dyn ExchangeCandleSource>,
    broker: Arc<AmqpBroker>,
    metrics: Arc<Metrics>,
    pair: String,
    timeframe: String,
    shutdown: &mut tokio::sync::watch::Receiver<bool>,
) {
    let mut last_published: i64 = i64::MIN;

    loop {
        if *shutdown.borrow() {
            info!(pair, "market streamer task exiting cleanly");
            return;
        }

        match exchange.next_candles(&pair).await {
            Ok(candles) => {
                if let Some(latest) = candles.into_iter().max_by_key(|c| c.timestamp_ms) {
                    if latest.timestamp_ms > last_published {
                        if let Err(e) = publish_candle(&broker, &pair, &timeframe, &latest).await {
                            warn!(pair, error = %e, "failed to publish candle");
                        } else {
                            last_published = latest.timestamp_ms;
                            metrics.candles_published_total.with_label_values(&[&pair]).inc();
                        }
                    }
                }
            }
            Err(e) => {
                warn!(pair, error = %e, "market streamer error, backing off");
                tokio::select! {
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    _ = shutdown.changed() => {}
                }
                continue;
            }
        }

        tokio::select! {
            _ = shutdown.changed() => {}
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }
    }
}

async fn publish_candle(broker: &AmqpBroker, pair: &str, timeframe: &str, candle: &Candle) -> anyhow::Result<()> {
    let payload = json!({
        "type": "market_data",
        "timestamp": candle.timestamp(),
        "pair": pair,
        "timeframe": timeframe,
        "timestamp_ms": candle.timestamp_ms,
        "open": candle.open,
        "high": candle.high,
        "low": candle.low,
        "close": candle.close,
        "volume": candle.volume,
    });
    broker.publish(RAW_MARKET_DATA_QUEUE, &payload, true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64) -> Candle {
        Candle {
            timestamp_ms: ts,
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 10.0,
        }
    }

    #[test]
    fn latest_candle_selection_picks_max_timestamp() {
        let candles = vec![candle(100), candle(300), candle(200)];
        let latest = candles.into_iter().max_by_key(|c| c.timestamp_ms).unwrap();
        assert_eq!(latest.timestamp_ms, 300);
    }
}
