//! Sentiment processor orchestration (§4.F) — the center of gravity of the
//! pipeline. Consumes `raw_news_data`, routes text through the oracle
//! cascade, classifies and pair-matches, and fans out one
//! `SentimentSignalMessage` per matched pair onto `sentiment_signals_queue`.

use crate::application::consumer::safe_message_consumer;
use crate::application::news_poller::RAW_NEWS_QUEUE;
use crate::domain::entities::article::Article;
use crate::domain::entities::sentiment::{classify, truncate_chars, SentimentSignal, CACHE_HEADLINE_TRUNCATE_LEN};
use crate::domain::errors::{ProcessingError, SchemaError, UnexpectedProcessingError};
use crate::domain::pair::match_pairs;
use crate::domain::ports::{MessageBroker, QueueArgs};
use crate::domain::validation::schema::validate_news;
use crate::infrastructure::broker::AmqpBroker;
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::oracle::OracleCascade;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

pub const SENTIMENT_SIGNALS_QUEUE: &str = "sentiment_signals_queue";

const ORACLE_INPUT_CONTENT_CHARS: usize = 500;
const QUEUE_DEPTH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

pub struct SentimentProcessor {
    broker: Arc<AmqpBroker>,
    cascade: Arc<OracleCascade>,
    metrics: Arc<Metrics>,
    pair_keywords: HashMap<String, Vec<String>>,
    general_fanout_enabled: bool,
}

impl SentimentProcessor {
    pub fn new(
        broker: Arc<AmqpBroker>,
        cascade: Arc<OracleCascade>,
        metrics: Arc<Metrics>,
        pair_keywords: HashMap<String, Vec<String>>,
        general_fanout_enabled: bool,
    ) -> Self {
        Self {
            broker,
            cascade,
            metrics,
            pair_keywords,
            general_fanout_enabled,
        }
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        self.broker.ensure_connection().await?;
        self.broker
            .declare_queue(RAW_NEWS_QUEUE, true, QueueArgs::default())
            .await?;
        self.broker
            .declare_queue(SENTIMENT_SIGNALS_QUEUE, true, QueueArgs::default())
            .await?;

        // Prefetch=1: oracle latency dominates, parallelism would starve it (§5).
        let mut consumer = self.broker.consume(RAW_NEWS_QUEUE, "sentiment-processor", 1).await?;
        let mut depth_poll = tokio::time::interval(QUEUE_DEPTH_POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("sentiment processor shutting down");
                        return Ok(());
                    }
                }
                _ = depth_poll.tick() => {
                    self.refresh_queue_depth().await;
                }
                next = consumer.next() => {
                    match next {
                        Some(Ok(delivery)) => {
                            let _ = safe_message_consumer(&delivery, RAW_NEWS_QUEUE, &self.metrics, |payload| self.handle(payload)).await;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "consumer stream error");
                        }
                        None => {
                            warn!("raw_news_data consumer stream ended");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, payload: Vec<u8>) -> Result<(), ProcessingError> {
        let article: Article = serde_json::from_slice(&payload).map_err(SchemaError::Json)?;
        let validated_source = validate_news(&article.source, &article.title, &article.url, &article.content)?;

        let scored = self.cascade.score(&oracle_input_text(&article)).await;
        if scored.fallback_used {
            self.metrics
                .oracle_fallbacks_total
                .with_label_values(&[fallback_tier(&scored.model)])
                .inc();
        }

        let matched_pairs = match_pairs(
            &format!("{} {}", article.title, article.content),
            &self.pair_keywords,
            self.general_fanout_enabled,
        );
        if matched_pairs.is_empty() {
            return Ok(());
        }

        let signals = build_signals(&article, &validated_source, &scored, matched_pairs, Utc::now());

        for signal in signals {
            let payload = serde_json::to_value(&signal).map_err(|e| {
                ProcessingError::Unexpected(UnexpectedProcessingError(format!("signal serialization failed: {e}")))
            })?;
            self.broker.publish(SENTIMENT_SIGNALS_QUEUE, &payload, true).await?;
            self.metrics
                .signals_produced_total
                .with_label_values(&[&signal.pair, &signal.model])
                .inc();
        }

        Ok(())
    }

    async fn refresh_queue_depth(&self) {
        match self.broker.queue_depth(RAW_NEWS_QUEUE).await {
            Ok(depth) => self.metrics.queue_depth_messages.with_label_values(&[RAW_NEWS_QUEUE]).set(depth as f64),
            Err(e) => warn!(error = %e, queue = RAW_NEWS_QUEUE, "queue depth poll failed"),
        }
    }
}

/// Oracle invokes on `title + ". " + content[:500]` per §4.F.
fn oracle_input_text(article: &Article) -> String {
    let content_excerpt: String = article.content.chars().take(ORACLE_INPUT_CONTENT_CHARS).collect();
    format!("{}. {}", article.title, content_excerpt)
}

fn fallback_tier(model: &str) -> &'static str {
    if model == "neutral_default" {
        "neutral"
    } else {
        "secondary"
    }
}

fn build_signals(
    article: &Article,
    validated_source: &str,
    scored: &crate::infrastructure::oracle::ScoredText,
    pairs: Vec<String>,
    analyzed_at: chrono::DateTime<Utc>,
) -> Vec<SentimentSignal> {
    let label = classify(scored.score);
    let headline = truncate_chars(&article.title, CACHE_HEADLINE_TRUNCATE_LEN);
    pairs
        .into_iter()
        .map(|pair| SentimentSignal {
            pair,
            score: scored.score,
            label,
            headline: headline.clone(),
            source: validated_source.to_string(),
            article_id: article.article_id.clone(),
            analyzed_at,
            model: scored.model.clone(),
            fallback_used: scored.fallback_used,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::oracle::ScoredText;

    fn sample_article(content_len: usize) -> Article {
        Article {
            message_type: "news_article".to_string(),
            article_id: "abc123".to_string(),
            source: "coindesk".to_string(),
            title: "Bitcoin surges to new highs".to_string(),
            url: "https://coindesk.com/x".to_string(),
            summary: "Bitcoin surges".to_string(),
            content: "a".repeat(content_len),
            published: Utc::now(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn oracle_input_truncates_content_to_500_chars() {
        let article = sample_article(2000);
        let text = oracle_input_text(&article);
        assert!(text.starts_with("Bitcoin surges to new highs. "));
        let excerpt_len = text.len() - "Bitcoin surges to new highs. ".len();
        assert_eq!(excerpt_len, ORACLE_INPUT_CONTENT_CHARS);
    }

    #[test]
    fn fallback_tier_distinguishes_neutral_from_secondary() {
        assert_eq!(fallback_tier("neutral_default"), "neutral");
        assert_eq!(fallback_tier("fallback_keywords"), "secondary");
        assert_eq!(fallback_tier("finbert-v2"), "secondary");
    }

    #[test]
    fn build_signals_fans_out_one_per_matched_pair_with_shared_fields() {
        let article = sample_article(50);
        let scored = ScoredText {
            score: 0.8,
            model: "finbert-v2".to_string(),
            fallback_used: false,
        };
        let signals = build_signals(
            &article,
            "coindesk",
            &scored,
            vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()],
            Utc::now(),
        );

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].pair, "BTC/USDT");
        assert_eq!(signals[1].pair, "ETH/USDT");
        for signal in &signals {
            assert_eq!(signal.score, 0.8);
            assert_eq!(signal.label, classify(0.8));
            assert_eq!(signal.article_id, "abc123");
            assert_eq!(signal.source, "coindesk");
            assert!(!signal.fallback_used);
        }
    }

    #[test]
    fn build_signals_empty_pairs_yields_no_signals() {
        let article = sample_article(50);
        let scored = ScoredText {
            score: 0.1,
            model: "finbert-v2".to_string(),
            fallback_used: false,
        };
        let signals = build_signals(&article, "coindesk", &scored, vec![], Utc::now());
        assert!(signals.is_empty());
    }
}
