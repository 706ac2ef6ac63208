//! Secondary oracle tier: a deterministic keyword-polarity scorer. Never
//! fails — it is the cascade's fallback when the primary oracle is down.

use crate::domain::entities::sentiment::clamp_score;
use crate::domain::errors::OracleError;
use crate::domain::ports::SentimentOracle;
use async_trait::async_trait;

const BULLISH_WORDS: &[&str] = &[
    "surge", "surges", "rally", "rallies", "soar", "soars", "skyrocket", "skyrockets", "bullish",
    "breakout", "moon", "mooning", "pump", "adoption", "breakthrough", "record high",
];

const BEARISH_WORDS: &[&str] = &[
    "crash", "crashes", "plunge", "plunges", "dump", "dumps", "bearish", "collapse", "collapses",
    "lawsuit", "ban", "hack", "hacked", "breach", "stolen", "scam", "fraud", "sell-off", "selloff",
    "panic", "fear",
];

pub struct KeywordOracle;

impl KeywordOracle {
    /// `score = (b - r) / (b + r + 1)`, clamped to [-1, 1].
    pub fn score_text(text: &str) -> f64 {
        let lower = text.to_lowercase();
        let b = BULLISH_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
        let r = BEARISH_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
        clamp_score((b - r) / (b + r + 1.0))
    }
}

#[async_trait]
impl SentimentOracle for KeywordOracle {
    fn name(&self) -> &str {
        "fallback_keywords"
    }

    async fn score(&self, text: &str) -> Result<f64, OracleError> {
        Ok(Self::score_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullish_text_scores_positive() {
        assert!(KeywordOracle::score_text("Bitcoin surges in a massive rally") > 0.0);
    }

    #[test]
    fn bearish_text_scores_negative() {
        assert!(KeywordOracle::score_text("Exchange hacked, crash and panic follow") < 0.0);
    }

    #[test]
    fn neutral_text_scores_near_zero() {
        assert_eq!(KeywordOracle::score_text("Quarterly earnings report released"), 0.0);
    }

    #[test]
    fn score_is_always_within_bounds() {
        let s = KeywordOracle::score_text("surge surge surge rally moon pump breakthrough adoption");
        assert!((-1.0..=1.0).contains(&s));
    }
}
