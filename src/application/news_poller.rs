//! News poller orchestration (§4.D): periodic multi-feed RSS pull, dedup by
//! stable article hash, crypto-keyword relevance filter, publish to
//! `raw_news_data`. `recent_seen` is owned by this struct, not a global —
//! per the redesign note in §9.

use crate::domain::entities::article::{self, Article, CONTENT_TRUNCATE_LEN, SUMMARY_TRUNCATE_LEN};
use crate::domain::feed_roster::is_crypto_relevant;
use crate::domain::ports::{MessageBroker, NewsFeedSource, QueueArgs};
use crate::infrastructure::broker::AmqpBroker;
use crate::infrastructure::news::html::truncate_chars;
use crate::infrastructure::observability::Metrics;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const RAW_NEWS_QUEUE: &str = "raw_news_data";

const RECENT_SEEN_HIGH_WATER_MARK: usize = 10_000;
const RECENT_SEEN_LOW_WATER_MARK: usize = 8_000;

/// Bounded, insertion-ordered set of recently-seen article ids. When it
/// exceeds the high-water mark, the oldest entries are dropped down to the
/// low-water mark (§3, §4.D).
#[derive(Default)]
struct RecentSeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl RecentSeenSet {
    fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    fn insert(&mut self, id: String) {
        if self.members.insert(id.clone()) {
            self.order.push_back(id);
        }
        if self.order.len() > RECENT_SEEN_HIGH_WATER_MARK {
            while self.order.len() > RECENT_SEEN_LOW_WATER_MARK {
                if let Some(oldest) = self.order.pop_front() {
                    self.members.remove(&oldest);
                } else {
                    break;
                }
            }
        }
    }
}

pub struct NewsPoller {
    feeds: Vec<Arc<dyn NewsFeedSource>>,
    broker: Arc<AmqpBroker>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
    recent_seen: RecentSeenSet,
}

impl NewsPoller {
    pub fn new(feeds: Vec<Arc<dyn NewsFeedSource>>, broker: Arc<AmqpBroker>, metrics: Arc<Metrics>, poll_interval: Duration) -> Self {
        Self {
            feeds,
            broker,
            metrics,
            poll_interval,
            recent_seen: RecentSeenSet::default(),
        }
    }

    /// Runs the poll loop until `shutdown` fires. Returns once a clean exit
    /// was observed.
    pub async fn run(&mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        self.broker.ensure_connection().await?;
        self.broker
            .declare_queue(RAW_NEWS_QUEUE, true, QueueArgs::default())
            .await?;

        loop {
            if *shutdown.borrow() {
                info!("news poller shutting down");
                return Ok(());
            }

            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("news poller shutting down mid-sleep");
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn run_cycle(&mut self) {
        let mut published = 0usize;
        let mut skipped = 0usize;

        for feed in self.feeds.clone() {
            match feed.fetch().await {
                Ok(entries) => {
                    for entry in entries {
                        match self.process_entry(feed.source_name(), &entry).await {
                            Ok(true) => published += 1,
                            Ok(false) => skipped += 1,
                            Err(e) => warn!(source = feed.source_name(), error = %e, "failed to publish article"),
                        }
                    }
                }
                Err(e) => warn!(source = feed.source_name(), error = %e, "feed fetch failed, continuing with other feeds"),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        info!(published, skipped, "news poll cycle complete");
    }

    /// Returns `Ok(true)` if the entry was published, `Ok(false)` if it was
    /// skipped as a duplicate or irrelevant.
    async fn process_entry(&mut self, source: &str, entry: &crate::domain::ports::FeedEntry) -> anyhow::Result<bool> {
        let id = article::article_id(&entry.title, &entry.url);
        if self.recent_seen.contains(&id) {
            return Ok(false);
        }

        let summary = truncate_chars(&entry.summary, SUMMARY_TRUNCATE_LEN);
        let content = truncate_chars(&entry.content, CONTENT_TRUNCATE_LEN);
        let combined = format!("{} {} {}", entry.title, summary, content);
        if !is_crypto_relevant(&combined) {
            return Ok(false);
        }

        let fetched_at = Utc::now();
        let article_msg = Article {
            message_type: "news_article".to_string(),
            article_id: id.clone(),
            source: source.to_string(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            summary,
            content,
            published: entry.published_at,
            fetched_at,
        };

        let payload = serde_json::to_value(&article_msg)?;
        self.broker.publish(RAW_NEWS_QUEUE, &payload, true).await?;
        self.metrics.articles_published_total.with_label_values(&[source]).inc();

        // Only mark as seen after a successful publish so a publish failure
        // is retried on the next cycle (§4.D failure semantics).
        self.recent_seen.insert(id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_seen_prunes_to_low_water_mark() {
        let mut set = RecentSeenSet::default();
        for i in 0..RECENT_SEEN_HIGH_WATER_MARK + 1 {
            set.insert(format!("id-{i}"));
        }
        assert!(set.order.len() <= RECENT_SEEN_LOW_WATER_MARK);
        // The most recently inserted id must still be present.
        assert!(set.contains(&format!("id-{RECENT_SEEN_HIGH_WATER_MARK}")));
        // The oldest ids must have been evicted.
        assert!(!set.contains("id-0"));
    }

    #[test]
    fn recent_seen_dedups_within_bounds() {
        let mut set = RecentSeenSet::default();
        set.insert("a".to_string());
        set.insert("a".to_string());
        assert_eq!(set.order.len(), 1);
        assert!(set.contains("a"));
    }
}
