//! RSS feed adapter implementing `NewsFeedSource`. Mirrors the teacher's
//! fetch-then-parse shape, generalized to the closed feed roster instead of
//! a single hardcoded URL.

use crate::domain::ports::{FeedEntry, NewsFeedSource};
use crate::infrastructure::news::html::strip_html;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rss::Channel;
use std::io::Cursor;
use uuid::Uuid;

pub struct RssFeedSource {
    source_name: &'static str,
    feed_url: &'static str,
    client: Client,
}

impl RssFeedSource {
    pub fn new(source_name: &'static str, feed_url: &'static str) -> Self {
        Self {
            source_name,
            feed_url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl NewsFeedSource for RssFeedSource {
    fn source_name(&self) -> &str {
        self.source_name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<FeedEntry>> {
        let bytes = self.client.get(self.feed_url).send().await?.bytes().await?;
        let channel = Channel::read_from(Cursor::new(bytes))?;

        let entries = channel
            .items()
            .iter()
            .map(|item| {
                let url = item.link().unwrap_or("").to_string();
                let title = strip_html(item.title().unwrap_or(""));
                let summary = strip_html(item.description().unwrap_or(""));
                let id = item
                    .guid()
                    .map(|g| g.value.to_string())
                    .unwrap_or_else(|| url.clone());
                let id = if id.is_empty() { Uuid::new_v4().to_string() } else { id };
                let published_at = item
                    .pub_date()
                    .and_then(|d| chrono::DateTime::parse_from_rfc2822(d).ok())
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now);

                FeedEntry {
                    id,
                    title: title.clone(),
                    content: summary.clone(),
                    summary,
                    url,
                    published_at,
                }
            })
            .collect();

        Ok(entries)
    }
}
