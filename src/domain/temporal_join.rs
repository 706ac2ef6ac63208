//! Backward-only temporal join between a candle stream and a signal stream,
//! with a bounded tolerance. This is the statically-typed replacement for a
//! dataframe `merge_asof(direction="backward")`: a moving pointer into the
//! sorted signal stream, advanced as candles are processed, never looking
//! past the candle's own timestamp.

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_TOLERANCE_HOURS: i64 = 6;
pub const DEFAULT_STALE_HOURS: i64 = 4;

/// A minimal view of a cached signal sufficient for the join: its score and
/// the time it was analyzed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSignal {
    pub score: f64,
    pub analyzed_at: DateTime<Utc>,
}

/// The outcome of joining one candle against the signal stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedSentiment {
    /// `0.0` when no signal was in range, or the signal was stale.
    pub score: f64,
    pub matched: Option<TimedSignal>,
    pub neutralized_reason: Option<NeutralizedReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralizedReason {
    NoSignalInTolerance,
    Stale,
}

/// Finds the latest signal with `timestamp <= candle_timestamp` and within
/// `tolerance` of it, scanning a candidate list that is assumed sorted
/// ascending by `analyzed_at`. Candidates strictly in the future relative to
/// `candle_timestamp` are never returned — this is the no-look-ahead
/// guarantee.
pub fn backward_match(
    candle_timestamp: DateTime<Utc>,
    signals_sorted_ascending: &[TimedSignal],
    tolerance: Duration,
) -> Option<TimedSignal> {
    signals_sorted_ascending
        .iter()
        .rev()
        .find(|s| s.analyzed_at <= candle_timestamp && candle_timestamp - s.analyzed_at <= tolerance)
        .copied()
}

/// Applies the backward match plus staleness neutralization, producing the
/// score the strategy join should actually use for this candle.
pub fn join_candle_sentiment(
    candle_timestamp: DateTime<Utc>,
    signals_sorted_ascending: &[TimedSignal],
    tolerance: Duration,
    stale_after: Duration,
) -> JoinedSentiment {
    let Some(matched) = backward_match(candle_timestamp, signals_sorted_ascending, tolerance) else {
        return JoinedSentiment {
            score: 0.0,
            matched: None,
            neutralized_reason: Some(NeutralizedReason::NoSignalInTolerance),
        };
    };

    let age = candle_timestamp - matched.analyzed_at;
    if age > stale_after {
        JoinedSentiment {
            score: 0.0,
            matched: Some(matched),
            neutralized_reason: Some(NeutralizedReason::Stale),
        }
    } else {
        JoinedSentiment {
            score: matched.score,
            matched: Some(matched),
            neutralized_reason: None,
        }
    }
}

/// Bias-detection query over a full candle/signal pairing, mirroring the
/// original implementation's quality-check (minus its file-writing report):
/// counts how many candle/signal pairs would require future data (a
/// correctness bug, not a tolerance miss) if matched naively.
pub fn count_future_lookups(
    candle_timestamps: &[DateTime<Utc>],
    signals_sorted_ascending: &[TimedSignal],
    tolerance: Duration,
) -> usize {
    candle_timestamps
        .iter()
        .filter_map(|t| backward_match(*t, signals_sorted_ascending, tolerance).map(|s| (*t, s)))
        .filter(|(t, s)| s.analyzed_at > *t)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + hour * 3600, 0).unwrap()
    }

    fn signal(hour: i64, score: f64) -> TimedSignal {
        TimedSignal {
            score,
            analyzed_at: ts(hour),
        }
    }

    #[test]
    fn picks_latest_signal_not_in_the_future() {
        let signals = vec![signal(0, 0.1), signal(2, 0.5), signal(10, 0.9)];
        let joined = join_candle_sentiment(ts(3), &signals, Duration::hours(6), Duration::hours(4));
        assert_eq!(joined.score, 0.5);
    }

    #[test]
    fn never_returns_a_future_signal() {
        let signals = vec![signal(5, 0.8)];
        // candle at hour 3 must not see the hour-5 signal.
        let m = backward_match(ts(3), &signals, Duration::hours(6));
        assert!(m.is_none());
    }

    #[test]
    fn out_of_tolerance_signal_is_not_matched() {
        let signals = vec![signal(0, 0.8)];
        let m = backward_match(ts(7), &signals, Duration::hours(6));
        assert!(m.is_none());
    }

    #[test]
    fn stale_signal_is_neutralized_to_zero() {
        let signals = vec![signal(0, 0.8)];
        // age exactly 5h, stale_after 4h.
        let joined = join_candle_sentiment(ts(5), &signals, Duration::hours(6), Duration::hours(4));
        assert_eq!(joined.score, 0.0);
        assert_eq!(joined.neutralized_reason, Some(NeutralizedReason::Stale));
    }

    #[test]
    fn age_exactly_at_stale_threshold_is_not_stale() {
        let signals = vec![signal(0, 0.8)];
        let joined = join_candle_sentiment(ts(4), &signals, Duration::hours(6), Duration::hours(4));
        assert_eq!(joined.score, 0.8);
        assert!(joined.neutralized_reason.is_none());
    }

    #[test]
    fn no_signal_in_range_is_neutral() {
        let joined = join_candle_sentiment(ts(100), &[], Duration::hours(6), Duration::hours(4));
        assert_eq!(joined.score, 0.0);
        assert_eq!(joined.neutralized_reason, Some(NeutralizedReason::NoSignalInTolerance));
    }

    #[test]
    fn count_future_lookups_is_zero_for_backward_only_matches() {
        let signals = vec![signal(0, 0.1), signal(2, 0.5)];
        let candles = vec![ts(1), ts(3)];
        assert_eq!(count_future_lookups(&candles, &signals, Duration::hours(6)), 0);
    }
}
