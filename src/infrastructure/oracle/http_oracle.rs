//! Primary oracle tier: an opaque financial sentiment model reached over
//! HTTP. Grounded in the prior implementation's Ollama-style client: a
//! single `/api/generate`-shaped endpoint, a templated prompt asking for one
//! number in [-1, 1], and a first-token float parse of the response.

use crate::config::OracleConfig;
use crate::domain::errors::OracleError;
use crate::domain::ports::SentimentOracle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROMPT_TEMPLATE: &str = "Rate the market sentiment of this crypto news text on a scale \
from -1 (very bearish) to 1 (very bullish). Respond with only the number.\n\nText: {text}";

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: config.base_url.clone(),
            model_name: config.model_name.clone(),
        }
    }

    /// Strips any leading prose and parses the first numeric token,
    /// clamping it to [-1, 1]. Returns `None` if nothing parseable is found.
    fn parse_sentiment_score(raw: &str) -> Option<f64> {
        let trimmed = raw.trim();
        let first_token = trimmed.split_whitespace().next()?;
        let cleaned: String = first_token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
            .collect();
        cleaned.parse::<f64>().ok().map(|v| v.clamp(-1.0, 1.0))
    }
}

#[async_trait]
impl SentimentOracle for HttpOracle {
    fn name(&self) -> &str {
        "primary"
    }

    async fn score(&self, text: &str) -> Result<f64, OracleError> {
        let prompt = PROMPT_TEMPLATE.replace("{text}", text);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: self.model_name.clone(),
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| OracleError::PrimaryUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OracleError::PrimaryUnavailable(format!(
                "oracle responded with status {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::PrimaryUnparseable(e.to_string()))?;

        Self::parse_sentiment_score(&body.response)
            .ok_or_else(|| OracleError::PrimaryUnparseable(body.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_number() {
        assert_eq!(HttpOracle::parse_sentiment_score("0.6"), Some(0.6));
        assert_eq!(HttpOracle::parse_sentiment_score("-0.4"), Some(-0.4));
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(HttpOracle::parse_sentiment_score("2.5"), Some(1.0));
        assert_eq!(HttpOracle::parse_sentiment_score("-3"), Some(-1.0));
    }

    #[test]
    fn unparseable_response_returns_none() {
        assert_eq!(HttpOracle::parse_sentiment_score("I think it's positive"), None);
    }
}
