//! Prometheus metrics for the sentiment pipeline.
//!
//! All metrics use the `cryptosent_` prefix and are read-only.

use prometheus::{
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
    CounterVec, Gauge, GaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Articles fetched, by feed source.
    pub articles_fetched_total: CounterVec,
    /// Articles published after dedup and relevance filtering, by source.
    pub articles_published_total: CounterVec,
    /// Sentiment signals produced, by pair and model tier.
    pub signals_produced_total: CounterVec,
    /// Oracle cascade fallbacks, by tier reached (`secondary`, `neutral`).
    pub oracle_fallbacks_total: CounterVec,
    /// Cache writes, by outcome (`ok`, `error`).
    pub cache_writes_total: CounterVec,
    /// Candles published, by pair.
    pub candles_published_total: CounterVec,
    /// Messages quarantined (nack, no requeue), by queue.
    pub quarantined_messages_total: CounterVec,
    /// Broker reconnect attempts.
    pub broker_reconnects_total: GenericGauge<AtomicF64>,
    /// Per-pair age in seconds of the most recently joined sentiment signal.
    pub signal_age_seconds: GenericGaugeVec<AtomicF64>,
    /// Messages handled by `safe_message_consumer`, by queue, regardless of outcome.
    pub messages_processed_total: CounterVec,
    /// Messages that did not ack cleanly (any nack), by queue.
    pub messages_errors_total: CounterVec,
    /// Last observed queue depth (messages ready), by queue.
    pub queue_depth_messages: GenericGaugeVec<AtomicF64>,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let articles_fetched_total = CounterVec::new(
            Opts::new("cryptosent_articles_fetched_total", "Total articles fetched by feed"),
            &["source"],
        )?;
        registry.register(Box::new(articles_fetched_total.clone()))?;

        let articles_published_total = CounterVec::new(
            Opts::new(
                "cryptosent_articles_published_total",
                "Total articles published after dedup and relevance filtering",
            ),
            &["source"],
        )?;
        registry.register(Box::new(articles_published_total.clone()))?;

        let signals_produced_total = CounterVec::new(
            Opts::new("cryptosent_signals_produced_total", "Total sentiment signals produced"),
            &["pair", "model"],
        )?;
        registry.register(Box::new(signals_produced_total.clone()))?;

        let oracle_fallbacks_total = CounterVec::new(
            Opts::new("cryptosent_oracle_fallbacks_total", "Oracle cascade fallback occurrences"),
            &["tier"],
        )?;
        registry.register(Box::new(oracle_fallbacks_total.clone()))?;

        let cache_writes_total = CounterVec::new(
            Opts::new("cryptosent_cache_writes_total", "Cache writes by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(cache_writes_total.clone()))?;

        let candles_published_total = CounterVec::new(
            Opts::new("cryptosent_candles_published_total", "Candles published by pair"),
            &["pair"],
        )?;
        registry.register(Box::new(candles_published_total.clone()))?;

        let quarantined_messages_total = CounterVec::new(
            Opts::new(
                "cryptosent_quarantined_messages_total",
                "Messages nacked without requeue, by queue",
            ),
            &["queue"],
        )?;
        registry.register(Box::new(quarantined_messages_total.clone()))?;

        let broker_reconnects_total = Gauge::with_opts(Opts::new(
            "cryptosent_broker_reconnects_total",
            "Broker reconnect attempts",
        ))?;
        registry.register(Box::new(broker_reconnects_total.clone()))?;

        let signal_age_seconds = GaugeVec::new(
            Opts::new(
                "cryptosent_signal_age_seconds",
                "Age in seconds of the most recently joined cached signal, by pair",
            ),
            &["pair"],
        )?;
        registry.register(Box::new(signal_age_seconds.clone()))?;

        let messages_processed_total = CounterVec::new(
            Opts::new(
                "cryptosent_messages_processed_total",
                "Messages handled by a consume loop, by queue",
            ),
            &["queue"],
        )?;
        registry.register(Box::new(messages_processed_total.clone()))?;

        let messages_errors_total = CounterVec::new(
            Opts::new(
                "cryptosent_messages_errors_total",
                "Messages that did not ack cleanly, by queue",
            ),
            &["queue"],
        )?;
        registry.register(Box::new(messages_errors_total.clone()))?;

        let queue_depth_messages = GaugeVec::new(
            Opts::new("cryptosent_queue_depth_messages", "Last observed queue depth, by queue"),
            &["queue"],
        )?;
        registry.register(Box::new(queue_depth_messages.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            articles_fetched_total,
            articles_published_total,
            signals_produced_total,
            oracle_fallbacks_total,
            cache_writes_total,
            candles_published_total,
            quarantined_messages_total,
            broker_reconnects_total,
            signal_age_seconds,
            messages_processed_total,
            messages_errors_total,
            queue_depth_messages,
        })
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to construct default Metrics registry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_render_carries_prefix() {
        let metrics = Metrics::new().expect("failed to create metrics");
        assert!(metrics.render().contains("cryptosent_"));
    }

    #[test]
    fn signal_counters_label_by_pair_and_model() {
        let metrics = Metrics::new().expect("failed to create metrics");
        metrics.signals_produced_total.with_label_values(&["BTC/USDT", "primary"]).inc();
        let output = metrics.render();
        assert!(output.contains("cryptosent_signals_produced_total"));
        assert!(output.contains("BTC/USDT"));
    }

    #[test]
    fn quarantine_counter_tracks_queue() {
        let metrics = Metrics::new().expect("failed to create metrics");
        metrics.quarantined_messages_total.with_label_values(&["raw_news_data"]).inc();
        let output = metrics.render();
        assert!(output.contains("cryptosent_quarantined_messages_total"));
    }

    #[test]
    fn processed_and_error_counters_and_queue_depth_are_registered() {
        let metrics = Metrics::new().expect("failed to create metrics");
        metrics.messages_processed_total.with_label_values(&["sentiment_signals_queue"]).inc();
        metrics.messages_errors_total.with_label_values(&["sentiment_signals_queue"]).inc();
        metrics.queue_depth_messages.with_label_values(&["sentiment_signals_queue"]).set(7.0);
        let output = metrics.render();
        assert!(output.contains("cryptosent_messages_processed_total"));
        assert!(output.contains("cryptosent_messages_errors_total"));
        assert!(output.contains("cryptosent_queue_depth_messages"));
    }
}
