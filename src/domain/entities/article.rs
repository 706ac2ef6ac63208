//! News article entity: the unit produced by the poller and consumed by the
//! sentiment processor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TITLE_MIN_LEN: usize = 1;
pub const TITLE_MAX_LEN: usize = 500;
pub const CONTENT_MIN_LEN: usize = 10;
pub const CONTENT_MAX_LEN: usize = 50_000;
pub const SUMMARY_TRUNCATE_LEN: usize = 500;
pub const CONTENT_TRUNCATE_LEN: usize = 2_000;

/// A news article as published onto `raw_news_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "type", default = "default_article_type")]
    pub message_type: String,
    pub article_id: String,
    pub source: String,
    pub title: String,
    #[serde(rename = "link")]
    pub url: String,
    pub summary: String,
    pub content: String,
    pub published: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

fn default_article_type() -> String {
    "news_article".to_string()
}

/// Stable fingerprint for an article: md5 of `title || "_" || link`. Matches
/// the original implementation's hashing exactly so the same input always
/// produces the same id irrespective of which service computes it.
pub fn article_id(title: &str, link: &str) -> String {
    let content = format!("{title}_{link}");
    format!("{:x}", md5::compute(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_is_deterministic() {
        let a = article_id("Bitcoin surges", "https://coindesk.com/x");
        let b = article_id("Bitcoin surges", "https://coindesk.com/x");
        assert_eq!(a, b);
    }

    #[test]
    fn article_id_differs_on_title_or_link_change() {
        let a = article_id("Bitcoin surges", "https://coindesk.com/x");
        let b = article_id("Bitcoin surges", "https://coindesk.com/y");
        let c = article_id("Bitcoin crashes", "https://coindesk.com/x");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn article_id_matches_known_md5_vector() {
        // title_link concatenation with underscore separator.
        let expected = format!("{:x}", md5::compute(b"title_link"));
        assert_eq!(article_id("title", "link"), expected);
    }
}
