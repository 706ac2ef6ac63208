//! Sentiment signal entity and classification: the output of the oracle
//! cascade, and the latest-per-pair record held in the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const VERY_BULLISH_THRESHOLD: f64 = 0.7;
pub const BULLISH_THRESHOLD: f64 = 0.3;
pub const BEARISH_THRESHOLD: f64 = -0.3;
pub const VERY_BEARISH_THRESHOLD: f64 = -0.7;

pub const CACHE_HEADLINE_TRUNCATE_LEN: usize = 100;
pub const HISTORY_HEADLINE_TRUNCATE_LEN: usize = 50;
pub const HISTORY_MAX_LEN: usize = 100;

/// The model tag attached to a fallback-tier result.
pub const MODEL_FALLBACK_KEYWORDS: &str = "fallback_keywords";
/// The model tag attached to the last-resort neutral result.
pub const MODEL_NEUTRAL_DEFAULT: &str = "neutral_default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    VeryBullish,
    Bullish,
    Neutral,
    Bearish,
    VeryBearish,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentLabel::VeryBullish => "very_bullish",
            SentimentLabel::Bullish => "bullish",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Bearish => "bearish",
            SentimentLabel::VeryBearish => "very_bearish",
        };
        write!(f, "{s}")
    }
}

/// Deterministic bucket of a raw score. Total over all of `[-1.0, 1.0]` (and
/// beyond — out-of-range scores still bucket sensibly at the extremes).
pub fn classify(score: f64) -> SentimentLabel {
    if score >= VERY_BULLISH_THRESHOLD {
        SentimentLabel::VeryBullish
    } else if score >= BULLISH_THRESHOLD {
        SentimentLabel::Bullish
    } else if score <= VERY_BEARISH_THRESHOLD {
        SentimentLabel::VeryBearish
    } else if score <= BEARISH_THRESHOLD {
        SentimentLabel::Bearish
    } else {
        SentimentLabel::Neutral
    }
}

pub fn clamp_score(score: f64) -> f64 {
    score.clamp(-1.0, 1.0)
}

/// One `(article, matched pair)` result, published onto
/// `sentiment_signals_queue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    pub pair: String,
    pub score: f64,
    pub label: SentimentLabel,
    pub headline: String,
    pub source: String,
    pub article_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub model: String,
    pub fallback_used: bool,
}

/// The latest signal for a pair, as stored under `sentiment:{pair}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPairSignal {
    pub score: f64,
    pub label: SentimentLabel,
    pub timestamp: DateTime<Utc>,
    pub headline: String,
    pub source: String,
    pub article_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CachedPairSignal {
    pub fn from_signal(signal: &SentimentSignal) -> Self {
        Self {
            score: signal.score,
            label: signal.label,
            timestamp: signal.analyzed_at,
            headline: truncate_chars(&signal.headline, CACHE_HEADLINE_TRUNCATE_LEN),
            source: signal.source.clone(),
            article_id: signal.article_id.clone(),
            model: Some(signal.model.clone()),
        }
    }
}

/// The compact entry pushed onto `sentiment_history:{pair}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub score: f64,
    pub label: SentimentLabel,
    pub timestamp: DateTime<Utc>,
    pub headline: String,
}

impl HistoryEntry {
    pub fn from_signal(signal: &SentimentSignal) -> Self {
        Self {
            score: signal.score,
            label: signal.label,
            timestamp: signal.analyzed_at,
            headline: truncate_chars(&signal.headline, HISTORY_HEADLINE_TRUNCATE_LEN),
        }
    }
}

/// Truncates to at most `max_chars` Unicode scalar values (not bytes), to
/// avoid splitting multi-byte characters at the boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_at_exact_bullish_threshold() {
        assert_eq!(classify(0.3), SentimentLabel::Bullish);
    }

    #[test]
    fn boundary_just_below_bullish_threshold_is_neutral() {
        assert_eq!(classify(0.29999), SentimentLabel::Neutral);
    }

    #[test]
    fn boundary_at_exact_bearish_threshold() {
        assert_eq!(classify(-0.3), SentimentLabel::Bearish);
    }

    #[test]
    fn very_bullish_and_very_bearish_extremes() {
        assert_eq!(classify(0.7), SentimentLabel::VeryBullish);
        assert_eq!(classify(-0.7), SentimentLabel::VeryBearish);
        assert_eq!(classify(1.5), SentimentLabel::VeryBullish);
        assert_eq!(classify(-1.5), SentimentLabel::VeryBearish);
    }

    #[test]
    fn classify_is_total_and_idempotent_over_range() {
        let mut x = -1.5;
        while x <= 1.5 {
            let a = classify(x);
            let b = classify(x);
            assert_eq!(a, b);
            x += 0.01;
        }
    }

    #[test]
    fn clamp_score_bounds_extremes() {
        assert_eq!(clamp_score(2.0), 1.0);
        assert_eq!(clamp_score(-2.0), -1.0);
        assert_eq!(clamp_score(0.2), 0.2);
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        let s = "hello world";
        assert_eq!(truncate_chars(s, 5), "hello");
        assert_eq!(truncate_chars(s, 100), s);
    }
}
