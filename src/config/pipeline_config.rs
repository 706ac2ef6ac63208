//! Pipeline-wide tuning knobs shared across services: trading pairs, poll
//! intervals, staleness thresholds, and the opt-in general-crypto fan-out.

use crate::config::validator::{self, VarSpec};
use crate::domain::errors::ConfigError;
use crate::domain::pair::is_valid_pair;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub trading_pairs: Vec<String>,
    pub candle_timeframe: String,
    pub news_poll_interval_secs: u64,
    pub sentiment_stale_hours: i64,
    pub dry_run: bool,
    /// Opt-in per §9's redesign note: general-crypto articles fan out to
    /// every configured pair only when explicitly enabled.
    pub general_crypto_fanout_enabled: bool,
    pub sentiment_buy_threshold: f64,
    pub sentiment_sell_threshold: f64,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let specs = [
            VarSpec {
                name: "TRADING_PAIRS",
                description: "comma-separated list of BASE/QUOTE pairs",
                default: Some("BTC/USDT,ETH/USDT,BNB/USDT"),
                validator: validator::non_empty,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "CANDLE_TIMEFRAME",
                description: "candle timeframe (e.g. 1m)",
                default: Some("1m"),
                validator: validator::non_empty,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "NEWS_POLL_INTERVAL",
                description: "seconds between news poll cycles",
                default: Some("300"),
                validator: positive_int,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "SENTIMENT_STALE_HOURS",
                description: "hours after which a cached signal is neutralized",
                default: Some("4"),
                validator: positive_int,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "DRY_RUN",
                description: "when true, waives exchange credential requirement",
                default: Some("false"),
                validator: bool_like,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "GENERAL_CRYPTO_FANOUT",
                description: "when true, general-crypto articles fan out to all pairs",
                default: Some("false"),
                validator: bool_like,
                optional_if: None,
                sensitive: false,
            },
        ];

        let resolved = validator::validate_all(&specs, "pipeline")?;

        let raw_pairs = validator::get(&resolved, "TRADING_PAIRS").unwrap();
        let trading_pairs = parse_trading_pairs(&raw_pairs)?;

        Ok(Self {
            trading_pairs,
            candle_timeframe: validator::get(&resolved, "CANDLE_TIMEFRAME").unwrap(),
            news_poll_interval_secs: validator::get(&resolved, "NEWS_POLL_INTERVAL").unwrap().parse().unwrap(),
            sentiment_stale_hours: validator::get(&resolved, "SENTIMENT_STALE_HOURS").unwrap().parse().unwrap(),
            dry_run: parse_bool(&validator::get(&resolved, "DRY_RUN").unwrap()),
            general_crypto_fanout_enabled: parse_bool(&validator::get(&resolved, "GENERAL_CRYPTO_FANOUT").unwrap()),
            sentiment_buy_threshold: 0.7,
            sentiment_sell_threshold: -0.5,
        })
    }
}

/// Parses and validates `TRADING_PAIRS`. Invalid entries are skipped with a
/// warning; if nothing valid remains, the processor must refuse to start.
pub fn parse_trading_pairs(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut pairs = Vec::new();
    for entry in raw.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_valid_pair(trimmed) {
            pairs.push(trimmed.to_string());
        } else {
            tracing::warn!(pair = trimmed, "skipping invalid trading pair in TRADING_PAIRS");
        }
    }
    if pairs.is_empty() {
        return Err(ConfigError::NoValidPairs);
    }
    Ok(pairs)
}

fn positive_int(v: &str) -> Result<(), String> {
    match v.parse::<u64>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err("must be a positive integer".to_string()),
    }
}

fn bool_like(v: &str) -> Result<(), String> {
    match v.to_lowercase().as_str() {
        "true" | "false" | "1" | "0" => Ok(()),
        _ => Err("must be true/false".to_string()),
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_lowercase().as_str(), "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_pairs() {
        let pairs = parse_trading_pairs("BTC/USDT, ETH/USDT").unwrap();
        assert_eq!(pairs, vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()]);
    }

    #[test]
    fn skips_invalid_entries_but_keeps_valid_ones() {
        let pairs = parse_trading_pairs("BTC/USDT, not-a-pair, ETH/USDT").unwrap();
        assert_eq!(pairs, vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()]);
    }

    #[test]
    fn refuses_to_start_with_no_valid_pairs() {
        let result = parse_trading_pairs("not-a-pair, also bad");
        assert!(result.is_err());
    }
}
