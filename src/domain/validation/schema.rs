//! Wire-level schema validation for the three queue payloads (§4.C). Each
//! validated message corresponds to an entity in `domain::entities`; this
//! module adds the closed-whitelist and cross-field invariants that must
//! hold again at every consume site, not only at the producer that built
//! the message in the first place.

use crate::domain::entities::candle::{MAX_PRICE, MIN_PRICE};
use crate::domain::errors::SchemaError;
use crate::domain::feed_roster::allowed_domain_for;
use crate::domain::pair::is_valid_pair;
use url::Url;

/// The only `model` tags a `SentimentSignalMessage` is allowed to carry.
pub const MODEL_WHITELIST: &[&str] = &["primary", "fallback_keywords", "neutral_default"];

fn char_len_in(s: &str, min: usize, max: usize) -> bool {
    let n = s.chars().count();
    n >= min && n <= max
}

/// Validates a news article against the `RawNewsMessage` schema: source
/// whitelist (case-insensitive), title/content length bounds, and
/// URL scheme + source↔domain agreement.
pub fn validate_news(source: &str, title: &str, url: &str, content: &str) -> Result<String, SchemaError> {
    let source_lower = source.to_lowercase();

    if !char_len_in(title, 1, 500) {
        return Err(SchemaError::InvalidField {
            field: "title".to_string(),
            reason: format!("must be 1-500 chars, got {}", title.chars().count()),
        });
    }
    if !char_len_in(content, 10, 50_000) {
        return Err(SchemaError::InvalidField {
            field: "content".to_string(),
            reason: format!("must be 10-50000 chars, got {}", content.chars().count()),
        });
    }

    let allowed_domain = allowed_domain_for(&source_lower).ok_or_else(|| SchemaError::NoAllowedDomain {
        source_name: source_lower.clone(),
    })?;

    let parsed = Url::parse(url).map_err(|e| SchemaError::InvalidField {
        field: "url".to_string(),
        reason: format!("not a valid URL: {e}"),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(SchemaError::InvalidField {
            field: "url".to_string(),
            reason: format!("scheme must be http or https, got {}", parsed.scheme()),
        });
    }
    let host = parsed.host_str().ok_or_else(|| SchemaError::InvalidField {
        field: "url".to_string(),
        reason: "url has no host".to_string(),
    })?;
    let domain_matches = host == allowed_domain || host.ends_with(&format!(".{allowed_domain}"));
    if !domain_matches {
        return Err(SchemaError::DomainMismatch {
            domain: host.to_string(),
            source_name: source_lower.clone(),
        });
    }

    Ok(source_lower)
}

/// Validates an OHLCV payload against the `RawMarketDataMessage` schema:
/// pair regex, sanity-bounded prices, non-negative volume, OHLC relationship.
pub fn validate_market_data(
    pair: &str,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
) -> Result<(), SchemaError> {
    if !is_valid_pair(pair) {
        return Err(SchemaError::InvalidField {
            field: "pair".to_string(),
            reason: format!("{pair} does not match ^[A-Z]{{3,5}}/[A-Z]{{3,5}}$"),
        });
    }
    for (name, value) in [("open", open), ("high", high), ("low", low), ("close", close)] {
        if !(value > MIN_PRICE && value < MAX_PRICE) {
            return Err(SchemaError::InvalidField {
                field: name.to_string(),
                reason: format!("{value} outside sanity bounds ({MIN_PRICE}, {MAX_PRICE})"),
            });
        }
    }
    if volume < 0.0 {
        return Err(SchemaError::InvalidField {
            field: "volume".to_string(),
            reason: format!("{volume} must be >= 0"),
        });
    }
    if !(high >= open && high >= close && high >= low) {
        return Err(SchemaError::InvalidField {
            field: "high".to_string(),
            reason: "high must be >= max(open, close, low)".to_string(),
        });
    }
    if !(low <= open && low <= close) {
        return Err(SchemaError::InvalidField {
            field: "low".to_string(),
            reason: "low must be <= min(open, close)".to_string(),
        });
    }
    Ok(())
}

/// Validates a `SentimentSignalMessage`: pair regex, score range, headline
/// length, optional confidence range, and model whitelist.
pub fn validate_sentiment_signal(
    pair: &str,
    score: f64,
    headline: &str,
    model: &str,
    confidence: Option<f64>,
) -> Result<(), SchemaError> {
    if !is_valid_pair(pair) {
        return Err(SchemaError::InvalidField {
            field: "pair".to_string(),
            reason: format!("{pair} does not match ^[A-Z]{{3,5}}/[A-Z]{{3,5}}$"),
        });
    }
    if !(-1.0..=1.0).contains(&score) {
        return Err(SchemaError::InvalidField {
            field: "score".to_string(),
            reason: format!("{score} outside [-1, 1]"),
        });
    }
    if !char_len_in(headline, 1, 500) {
        return Err(SchemaError::InvalidField {
            field: "headline".to_string(),
            reason: format!("must be 1-500 chars, got {}", headline.chars().count()),
        });
    }
    if !MODEL_WHITELIST.contains(&model) {
        return Err(SchemaError::InvalidField {
            field: "model".to_string(),
            reason: format!("{model} is not in the model whitelist"),
        });
    }
    if let Some(c) = confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(SchemaError::InvalidField {
                field: "confidence".to_string(),
                reason: format!("{c} outside [0, 1]"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_news_passes() {
        let r = validate_news("coindesk", "Bitcoin surges", "https://coindesk.com/x", "0123456789");
        assert!(r.is_ok());
    }

    #[test]
    fn news_rejects_mismatched_domain() {
        let r = validate_news("coindesk", "Bitcoin surges", "https://evil.example/x", "0123456789");
        assert!(matches!(r, Err(SchemaError::DomainMismatch { .. })));
    }

    #[test]
    fn news_rejects_unknown_source() {
        let r = validate_news("not_a_source", "Bitcoin surges", "https://not-a-source.com/x", "0123456789");
        assert!(matches!(r, Err(SchemaError::NoAllowedDomain { .. })));
    }

    #[test]
    fn news_rejects_short_content() {
        let r = validate_news("coindesk", "Bitcoin surges", "https://coindesk.com/x", "short");
        assert!(r.is_err());
    }

    #[test]
    fn news_accepts_subdomain_of_allowed_domain() {
        let r = validate_news("coindesk", "Bitcoin surges", "https://www.coindesk.com/x", "0123456789");
        assert!(r.is_ok());
    }

    #[test]
    fn market_data_valid_ohlc_passes() {
        assert!(validate_market_data("BTC/USDT", 100.0, 105.0, 95.0, 102.0, 10.0).is_ok());
    }

    #[test]
    fn market_data_rejects_high_below_open() {
        let r = validate_market_data("BTC/USDT", 100.0, 90.0, 80.0, 95.0, 1.0);
        assert!(r.is_err());
    }

    #[test]
    fn market_data_rejects_bad_pair() {
        let r = validate_market_data("btcusdt", 100.0, 105.0, 95.0, 102.0, 1.0);
        assert!(r.is_err());
    }

    #[test]
    fn market_data_rejects_negative_volume() {
        let r = validate_market_data("BTC/USDT", 100.0, 105.0, 95.0, 102.0, -1.0);
        assert!(r.is_err());
    }

    #[test]
    fn sentiment_signal_valid_passes() {
        assert!(validate_sentiment_signal("BTC/USDT", 0.5, "headline", "primary", Some(0.9)).is_ok());
    }

    #[test]
    fn sentiment_signal_rejects_out_of_range_score() {
        assert!(validate_sentiment_signal("BTC/USDT", 1.5, "headline", "primary", None).is_err());
    }

    #[test]
    fn sentiment_signal_rejects_unknown_model() {
        assert!(validate_sentiment_signal("BTC/USDT", 0.5, "headline", "made_up_model", None).is_err());
    }

    #[test]
    fn sentiment_signal_rejects_out_of_range_confidence() {
        assert!(validate_sentiment_signal("BTC/USDT", 0.5, "headline", "primary", Some(1.5)).is_err());
    }
}
