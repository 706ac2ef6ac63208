//! Signal cacher orchestration (§4.G): consumes `sentiment_signals_queue`
//! and upserts the latest-per-pair cache record plus a bounded history list.
//! History-write failures are logged and swallowed rather than failing the
//! whole message, since the latest-signal hash is the record that downstream
//! joins actually depend on.

use crate::application::consumer::safe_message_consumer;
use crate::application::sentiment_processor::SENTIMENT_SIGNALS_QUEUE;
use crate::domain::entities::sentiment::{CachedPairSignal, HistoryEntry, SentimentSignal, HISTORY_MAX_LEN};
use crate::domain::errors::{ProcessingError, SchemaError, UnexpectedProcessingError};
use crate::domain::ports::{CacheStore, MessageBroker, QueueArgs};
use crate::domain::validation::schema::validate_sentiment_signal;
use crate::infrastructure::broker::AmqpBroker;
use crate::infrastructure::cache::RedisCache;
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

const STATS_LOG_INTERVAL: u64 = 50;
const QUEUE_DEPTH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

pub struct SignalCacher {
    broker: Arc<AmqpBroker>,
    cache: Arc<RedisCache>,
    metrics: Arc<Metrics>,
    ttl_seconds: u64,
}

impl SignalCacher {
    pub fn new(broker: Arc<AmqpBroker>, cache: Arc<RedisCache>, metrics: Arc<Metrics>, ttl_seconds: u64) -> Self {
        Self {
            broker,
            cache,
            metrics,
            ttl_seconds,
        }
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        self.broker.ensure_connection().await?;
        self.broker
            .declare_queue(SENTIMENT_SIGNALS_QUEUE, true, QueueArgs::default())
            .await?;

        let mut consumer = self.broker.consume(SENTIMENT_SIGNALS_QUEUE, "signal-cacher", 10).await?;
        let mut depth_poll = tokio::time::interval(QUEUE_DEPTH_POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("signal cacher shutting down");
                        return Ok(());
                    }
                }
                _ = depth_poll.tick() => {
                    match self.broker.queue_depth(SENTIMENT_SIGNALS_QUEUE).await {
                        Ok(depth) => self.metrics.queue_depth_messages.with_label_values(&[SENTIMENT_SIGNALS_QUEUE]).set(depth as f64),
                        Err(e) => warn!(error = %e, queue = SENTIMENT_SIGNALS_QUEUE, "queue depth poll failed"),
                    }
                }
                next = consumer.next() => {
                    match next {
                        Some(Ok(delivery)) => {
                            let _ = safe_message_consumer(&delivery, SENTIMENT_SIGNALS_QUEUE, &self.metrics, |payload| self.handle(payload)).await;
                            let processed = self
                                .metrics
                                .messages_processed_total
                                .with_label_values(&[SENTIMENT_SIGNALS_QUEUE])
                                .get() as u64;
                            if processed % STATS_LOG_INTERVAL == 0 {
                                let errors = self
                                    .metrics
                                    .messages_errors_total
                                    .with_label_values(&[SENTIMENT_SIGNALS_QUEUE])
                                    .get() as u64;
                                info!(processed, errors, "signal cacher stats");
                            }
                        }
                        Some(Err(e)) => error!(error = %e, "consumer stream error"),
                        None => {
                            warn!("sentiment_signals_queue consumer stream ended");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, payload: Vec<u8>) -> Result<(), ProcessingError> {
        let signal: SentimentSignal = serde_json::from_slice(&payload).map_err(SchemaError::Json)?;
        validate_sentiment_signal(
            &signal.pair,
            signal.score,
            &signal.headline,
            &signal.model,
            None,
        )?;

        let cached = CachedPairSignal::from_signal(&signal);
        let cache_key = format!("sentiment:{}", signal.pair);
        let cache_value = serde_json::to_value(&cached).map_err(|e| {
            ProcessingError::Unexpected(UnexpectedProcessingError(format!("cache value serialization failed: {e}")))
        })?;

        self.cache.hset_json(&cache_key, &cache_value).await?;
        if self.ttl_seconds > 0 {
            self.cache.expire(&cache_key, self.ttl_seconds).await?;
        }
        self.metrics.cache_writes_total.with_label_values(&["ok"]).inc();

        let history_key = format!("sentiment_history:{}", signal.pair);
        let history_entry = HistoryEntry::from_signal(&signal);
        match serde_json::to_string(&history_entry) {
            Ok(entry_json) => {
                if let Err(e) = self.cache.lpush(&history_key, &entry_json).await {
                    warn!(pair = %signal.pair, error = %e, "history push failed, continuing");
                } else if let Err(e) = self.cache.ltrim(&history_key, 0, HISTORY_MAX_LEN as isize - 1).await {
                    warn!(pair = %signal.pair, error = %e, "history trim failed, continuing");
                }
            }
            Err(e) => warn!(pair = %signal.pair, error = %e, "history entry serialization failed, continuing"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::sentiment::SentimentLabel;
    use chrono::Utc;

    fn sample_signal() -> SentimentSignal {
        SentimentSignal {
            pair: "BTC/USDT".to_string(),
            score: 0.5,
            label: SentimentLabel::Bullish,
            headline: "Bitcoin rallies".to_string(),
            source: "coindesk".to_string(),
            article_id: "abc123".to_string(),
            analyzed_at: Utc::now(),
            model: "primary".to_string(),
            fallback_used: false,
        }
    }

    #[test]
    fn cached_pair_signal_carries_model_tag() {
        let signal = sample_signal();
        let cached = CachedPairSignal::from_signal(&signal);
        assert_eq!(cached.model.as_deref(), Some("primary"));
    }

    #[test]
    fn history_entry_truncates_headline_tighter_than_cache_record() {
        let mut signal = sample_signal();
        signal.headline = "x".repeat(200);
        let history = HistoryEntry::from_signal(&signal);
        let cached = CachedPairSignal::from_signal(&signal);
        assert!(history.headline.chars().count() <= 50);
        assert!(cached.headline.chars().count() <= 100);
        assert!(history.headline.chars().count() < cached.headline.chars().count());
    }
}
