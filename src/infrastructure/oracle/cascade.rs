//! Oracle cascade: primary → secondary → neutral. Never propagates a
//! failure to the caller — sentiment scoring must not stop the pipeline.

use crate::domain::entities::sentiment::{clamp_score, MODEL_NEUTRAL_DEFAULT};
use crate::domain::ports::SentimentOracle;
use crate::infrastructure::core::circuit_breaker::CircuitBreaker;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct OracleCascade {
    primary: Arc<dyn SentimentOracle>,
    secondary: Arc<dyn SentimentOracle>,
    circuit_breaker: CircuitBreaker,
}

pub struct ScoredText {
    pub score: f64,
    pub model: String,
    pub fallback_used: bool,
}

impl OracleCascade {
    pub fn new(primary: Arc<dyn SentimentOracle>, secondary: Arc<dyn SentimentOracle>) -> Self {
        Self {
            primary,
            secondary,
            circuit_breaker: CircuitBreaker::new("oracle-primary", 5, 2, Duration::from_secs(60)),
        }
    }

    pub async fn score(&self, text: &str) -> ScoredText {
        let primary_result = self.circuit_breaker.call(self.primary.score(text)).await;

        match primary_result {
            Ok(score) => ScoredText {
                score: clamp_score(score),
                model: self.primary.name().to_string(),
                fallback_used: false,
            },
            Err(e) => {
                warn!(error = %e, "primary oracle failed, falling back to secondary");
                match self.secondary.score(text).await {
                    Ok(score) => ScoredText {
                        score: clamp_score(score),
                        model: self.secondary.name().to_string(),
                        fallback_used: true,
                    },
                    Err(e) => {
                        warn!(error = %e, "secondary oracle failed, using neutral default");
                        ScoredText {
                            score: 0.0,
                            model: MODEL_NEUTRAL_DEFAULT.to_string(),
                            fallback_used: true,
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::OracleError;
    use async_trait::async_trait;

    struct AlwaysFails;
    #[async_trait]
    impl SentimentOracle for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }
        async fn score(&self, _text: &str) -> Result<f64, OracleError> {
            Err(OracleError::PrimaryUnavailable("boom".to_string()))
        }
    }

    struct AlwaysScores(f64);
    #[async_trait]
    impl SentimentOracle for AlwaysScores {
        fn name(&self) -> &str {
            "always_scores"
        }
        async fn score(&self, _text: &str) -> Result<f64, OracleError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn falls_through_to_secondary_when_primary_fails() {
        let cascade = OracleCascade::new(Arc::new(AlwaysFails), Arc::new(AlwaysScores(0.5)));
        let result = cascade.score("text").await;
        assert_eq!(result.score, 0.5);
        assert!(result.fallback_used);
        assert_eq!(result.model, "always_scores");
    }

    #[tokio::test]
    async fn falls_through_to_neutral_when_both_fail() {
        let cascade = OracleCascade::new(Arc::new(AlwaysFails), Arc::new(AlwaysFails));
        let result = cascade.score("text").await;
        assert_eq!(result.score, 0.0);
        assert_eq!(result.model, MODEL_NEUTRAL_DEFAULT);
    }

    #[tokio::test]
    async fn uses_primary_when_it_succeeds() {
        let cascade = OracleCascade::new(Arc::new(AlwaysScores(0.8)), Arc::new(AlwaysScores(-0.2)));
        let result = cascade.score("text").await;
        assert_eq!(result.score, 0.8);
        assert!(!result.fallback_used);
    }
}
