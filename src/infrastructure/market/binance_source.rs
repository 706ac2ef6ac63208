//! Exchange candle source backed by Binance's public klines REST endpoint.
//! The streamer drives this with its own per-pair polling loop; each call
//! returns whatever candles closed since the last call, which stands in for
//! the "next batch from the push stream" shape the port describes.

use crate::domain::entities::Candle;
use crate::domain::ports::ExchangeCandleSource;
use crate::infrastructure::core::circuit_breaker::CircuitBreaker;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// One row of Binance's `/api/v3/klines` response, decoded positionally.
#[derive(Debug, Deserialize)]
struct RawKline(
    i64,    // open time
    String, // open
    String, // high
    String, // low
    String, // close
    String, // volume
    i64,    // close time
    #[serde(skip)] serde::de::IgnoredAny,
    #[serde(skip)] serde::de::IgnoredAny,
    #[serde(skip)] serde::de::IgnoredAny,
    #[serde(skip)] serde::de::IgnoredAny,
    #[serde(skip)] serde::de::IgnoredAny,
);

pub struct BinanceCandleSource {
    client: ClientWithMiddleware,
    base_url: String,
    interval: String,
    circuit_breaker: Arc<CircuitBreaker>,
    last_open_time: RwLock<std::collections::HashMap<String, i64>>,
}

impl BinanceCandleSource {
    pub fn new(base_url: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            interval: interval.into(),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                "BinanceCandleSource",
                5,
                3,
                Duration::from_secs(60),
            )),
            last_open_time: RwLock::new(std::collections::HashMap::new()),
        }
    }

    fn binance_symbol(pair: &str) -> String {
        pair.replace('/', "")
    }
}

#[async_trait]
impl ExchangeCandleSource for BinanceCandleSource {
    async fn next_candles(&self, pair: &str) -> anyhow::Result<Vec<Candle>> {
        let symbol = Self::binance_symbol(pair);
        let url = build_url_with_query(
            &format!("{}/api/v3/klines", self.base_url),
            &[
                ("symbol", symbol.as_str()),
                ("interval", self.interval.as_str()),
                ("limit", "5"),
            ],
        );

        let client = self.client.clone();
        let result = self
            .circuit_breaker
            .call(async move {
                client
                    .get(&url)
                    .send()
                    .await
                    .context("binance klines request failed")?
                    .json::<Vec<RawKline>>()
                    .await
                    .context("binance klines response was not parseable")
            })
            .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => anyhow::bail!("binance candle fetch failed: {e}"),
        };

        let mut seen = self.last_open_time.write().await;
        let floor = *seen.get(pair).unwrap_or(&i64::MIN);

        let mut candles: Vec<Candle> = raw
            .into_iter()
            .filter(|k| k.0 > floor)
            .map(|k| Candle {
                timestamp_ms: k.0,
                open: k.1.parse().unwrap_or(0.0),
                high: k.2.parse().unwrap_or(0.0),
                low: k.3.parse().unwrap_or(0.0),
                close: k.4.parse().unwrap_or(0.0),
                volume: k.5.parse().unwrap_or(0.0),
            })
            .collect();

        candles.sort_by_key(|c| c.timestamp_ms);
        if let Some(last) = candles.last() {
            seen.insert(pair.to_string(), last.timestamp_ms);
        }

        Ok(candles)
    }
}
