//! Trading pair validation and keyword-based article-to-pair matching.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

pub static PAIR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3,5}/[A-Z]{3,5}$").expect("static pair regex is valid"));

pub fn is_valid_pair(pair: &str) -> bool {
    PAIR_REGEX.is_match(pair)
}

/// General-crypto vocabulary: an article matching none of the specific pair
/// keyword lists but containing one of these is, if fan-out is enabled,
/// broadcast to every configured pair.
pub const GENERAL_CRYPTO_KEYWORDS: &[&str] = &["crypto", "cryptocurrency", "blockchain", "market"];

/// Default pair → keyword-list table, ported from the prior implementation's
/// `TRADING_PAIRS` mapping.
pub fn default_pair_keywords() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        "BTC/USDT".to_string(),
        vec!["bitcoin".to_string(), "btc".to_string()],
    );
    map.insert(
        "ETH/USDT".to_string(),
        vec!["ethereum".to_string(), "eth".to_string(), "ether".to_string()],
    );
    map.insert(
        "BNB/USDT".to_string(),
        vec![
            "binance".to_string(),
            "bnb".to_string(),
            "binance coin".to_string(),
        ],
    );
    map
}

/// Matches a keyword as a whole word (word-boundary) inside `text`, the same
/// rule the original sentiment processor used for pair matching (as opposed
/// to the looser substring match the poller uses for crypto-relevance).
pub fn contains_whole_word(text: &str, keyword: &str) -> bool {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(keyword));
    // A keyword table is short and built once per process; compiling here is
    // simple and avoids carrying a cache keyed by arbitrary keyword strings.
    Regex::new(&pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Returns the set of pairs that `text` matches, given the configured
/// keyword table and whether general-crypto fan-out is enabled.
pub fn match_pairs(
    text: &str,
    pair_keywords: &HashMap<String, Vec<String>>,
    general_fanout_enabled: bool,
) -> Vec<String> {
    let mut matched: Vec<String> = pair_keywords
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| contains_whole_word(text, kw)))
        .map(|(pair, _)| pair.clone())
        .collect();

    if matched.is_empty() && general_fanout_enabled {
        let is_general_crypto = GENERAL_CRYPTO_KEYWORDS
            .iter()
            .any(|kw| contains_whole_word(text, kw));
        if is_general_crypto {
            matched = pair_keywords.keys().cloned().collect();
        }
    }

    matched.sort();
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_pairs_match_regex() {
        assert!(is_valid_pair("BTC/USDT"));
        assert!(is_valid_pair("ETH/USD"));
        assert!(is_valid_pair("ABCDE/FGHIJ"));
    }

    #[test]
    fn invalid_pairs_rejected() {
        assert!(!is_valid_pair("btc/usdt"));
        assert!(!is_valid_pair("BTCUSDT"));
        assert!(!is_valid_pair("BTC/US"));
        assert!(!is_valid_pair("ABCDEF/GH"));
        assert!(!is_valid_pair(""));
    }

    #[test]
    fn whole_word_matching_ignores_substrings() {
        // "eth" should not match inside "ethics" or "ethereum"
        assert!(!contains_whole_word("an ethics debate", "eth"));
        assert!(!contains_whole_word("ethereum just rallied", "eth"));
        assert!(contains_whole_word("eth just rallied", "eth"));
    }

    #[test]
    fn match_pairs_finds_specific_pair() {
        let table = default_pair_keywords();
        let matched = match_pairs("Bitcoin rallies on ETF news", &table, false);
        assert_eq!(matched, vec!["BTC/USDT".to_string()]);
    }

    #[test]
    fn match_pairs_fanout_only_when_enabled() {
        let table = default_pair_keywords();
        let text = "the broader crypto market rallied today";
        assert!(match_pairs(text, &table, false).is_empty());
        let fanned = match_pairs(text, &table, true);
        assert_eq!(fanned.len(), table.len());
    }

    #[test]
    fn match_pairs_no_match_no_fanout_when_irrelevant() {
        let table = default_pair_keywords();
        let matched = match_pairs("unrelated sports news today", &table, true);
        assert!(matched.is_empty());
    }
}
