//! OHLCV candle entity: the unit produced by the market streamer and
//! consumed by the strategy join.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_PRICE: f64 = 1e-6;
pub const MAX_PRICE: f64 = 1e6;

/// One OHLCV bar for a pair/timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms).unwrap_or_else(Utc::now)
    }

    /// `high >= max(open, close, low)` and `low <= min(open, close, high)`.
    pub fn has_valid_ohlc_relationship(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    pub fn prices_within_sanity_bounds(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| *p > MIN_PRICE && *p < MAX_PRICE)
    }

    pub fn volume_is_valid(&self) -> bool {
        self.volume >= 0.0
    }
}

impl ta::Open for Candle {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Candle {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Candle {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Candle {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Candle {
    fn volume(&self) -> f64 {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp_ms: 0,
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn valid_candle_passes() {
        assert!(candle(100.0, 105.0, 95.0, 102.0).has_valid_ohlc_relationship());
    }

    #[test]
    fn high_below_open_is_invalid() {
        // high=90 < open=100
        assert!(!candle(100.0, 90.0, 80.0, 95.0).has_valid_ohlc_relationship());
    }

    #[test]
    fn low_above_close_is_invalid() {
        assert!(!candle(100.0, 110.0, 101.0, 95.0).has_valid_ohlc_relationship());
    }

    #[test]
    fn sanity_bounds_reject_out_of_range_prices() {
        assert!(!candle(0.0, 1.0, 0.0, 1.0).prices_within_sanity_bounds());
        assert!(!candle(2e6, 2e6, 2e6, 2e6).prices_within_sanity_bounds());
    }
}
