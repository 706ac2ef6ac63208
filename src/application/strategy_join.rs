//! Strategy join orchestration (§4.H): the sole consumer of `raw_market_data`
//! that also reads the sentiment cache, producing the joined indicator +
//! sentiment snapshot a downstream strategy host would trade on. Holding and
//! trading that signal is out of scope (§Non-goals) — only the join and the
//! decision snapshot are built here, optionally published to
//! `strategy_state:{pair}` for an external monitor.

use crate::application::consumer::safe_message_consumer;
use crate::application::market_streamer::RAW_MARKET_DATA_QUEUE;
use crate::domain::entities::candle::Candle;
use crate::domain::entities::sentiment::CachedPairSignal;
use crate::domain::errors::{ProcessingError, SchemaError, UnexpectedProcessingError};
use crate::domain::ports::{CacheStore, MessageBroker, QueueArgs};
use crate::domain::validation::schema::validate_market_data;
use crate::infrastructure::broker::AmqpBroker;
use crate::infrastructure::cache::RedisCache;
use crate::infrastructure::observability::Metrics;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::Next;
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tracing::{info, warn};

pub const EMA_SHORT_PERIOD: usize = 12;
pub const EMA_LONG_PERIOD: usize = 26;
pub const RSI_PERIOD: usize = 14;
pub const RSI_LOW: f64 = 30.0;
pub const RSI_HIGH: f64 = 70.0;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const VOLUME_MA_PERIOD: usize = 20;
pub const ATR_PERIOD: usize = 14;
const QUEUE_DEPTH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Per-pair running indicator state. `ta`'s indicators are stateful and
/// stream one bar at a time via `Next`, so one instance set lives per pair
/// for the lifetime of the process.
struct PairIndicators {
    ema_short: ExponentialMovingAverage,
    ema_long: ExponentialMovingAverage,
    rsi: RelativeStrengthIndex,
    macd: MovingAverageConvergenceDivergence,
    bollinger: BollingerBands,
    atr: AverageTrueRange,
    volume_ma: SimpleMovingAverage,
    last: Option<IndicatorSnapshot>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct IndicatorSnapshot {
    ema_short: f64,
    ema_long: f64,
    rsi: f64,
    macd: f64,
    macd_signal: f64,
    bollinger_upper: f64,
    bollinger_lower: f64,
    volume_mean: f64,
    atr: f64,
    close: f64,
    volume: f64,
}

impl PairIndicators {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            ema_short: ExponentialMovingAverage::new(EMA_SHORT_PERIOD)?,
            ema_long: ExponentialMovingAverage::new(EMA_LONG_PERIOD)?,
            rsi: RelativeStrengthIndex::new(RSI_PERIOD)?,
            macd: MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)?,
            bollinger: BollingerBands::new(BOLLINGER_PERIOD, BOLLINGER_STD_DEV)?,
            atr: AverageTrueRange::new(ATR_PERIOD)?,
            volume_ma: SimpleMovingAverage::new(VOLUME_MA_PERIOD)?,
            last: None,
        })
    }

    fn update(&mut self, candle: &Candle) -> IndicatorSnapshot {
        let macd_out = self.macd.next(candle);
        let bb_out = self.bollinger.next(candle);
        let snapshot = IndicatorSnapshot {
            ema_short: self.ema_short.next(candle.close),
            ema_long: self.ema_long.next(candle.close),
            rsi: self.rsi.next(candle.close),
            macd: macd_out.macd,
            macd_signal: macd_out.signal,
            bollinger_upper: bb_out.upper,
            bollinger_lower: bb_out.lower,
            volume_mean: self.volume_ma.next(candle.volume),
            atr: self.atr.next(candle),
            close: candle.close,
            volume: candle.volume,
        };
        self.last = Some(snapshot);
        snapshot
    }
}

/// Entry/exit decision computed from one candle's indicator snapshot joined
/// with the cached sentiment for that pair.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StrategyDecision {
    pub should_enter: bool,
    pub should_exit: bool,
    pub sentiment_score: f64,
    pub sentiment_stale: bool,
}

pub struct StrategyJoinConfig {
    pub sentiment_buy_threshold: f64,
    pub sentiment_sell_threshold: f64,
    pub sentiment_stale_hours: i64,
}

pub struct StrategyJoin {
    broker: Arc<AmqpBroker>,
    cache: Arc<RedisCache>,
    metrics: Arc<Metrics>,
    config: StrategyJoinConfig,
    indicators: Mutex<HashMap<String, PairIndicators>>,
}

/// Entry requires bullish, non-stale sentiment plus trend/momentum/volume
/// confirmation; exit trips on bearish sentiment alone or on trend/momentum
/// reversal, whichever comes first (§4.H, §9a numeric defaults).
fn decide(config: &StrategyJoinConfig, snapshot: &IndicatorSnapshot, sentiment_score: f64, sentiment_stale: bool) -> StrategyDecision {
    let should_enter = !sentiment_stale
        && sentiment_score > config.sentiment_buy_threshold
        && snapshot.ema_short > snapshot.ema_long
        && snapshot.rsi > RSI_LOW
        && snapshot.rsi < RSI_HIGH
        && snapshot.macd > snapshot.macd_signal
        && snapshot.volume > snapshot.volume_mean
        && snapshot.close < snapshot.bollinger_upper;

    let should_exit = sentiment_score < config.sentiment_sell_threshold
        || (snapshot.ema_short < snapshot.ema_long && snapshot.rsi > RSI_HIGH)
        || snapshot.macd < snapshot.macd_signal;

    StrategyDecision {
        should_enter,
        should_exit,
        sentiment_score,
        sentiment_stale,
    }
}

impl StrategyJoin {
    pub fn new(broker: Arc<AmqpBroker>, cache: Arc<RedisCache>, metrics: Arc<Metrics>, config: StrategyJoinConfig) -> Self {
        Self {
            broker,
            cache,
            metrics,
            config,
            indicators: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        self.broker.ensure_connection().await?;
        self.broker
            .declare_queue(RAW_MARKET_DATA_QUEUE, true, QueueArgs::default())
            .await?;

        let mut consumer = self.broker.consume(RAW_MARKET_DATA_QUEUE, "strategy-join", 10).await?;
        let mut depth_poll = tokio::time::interval(QUEUE_DEPTH_POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("strategy join shutting down");
                        return Ok(());
                    }
                }
                _ = depth_poll.tick() => {
                    match self.broker.queue_depth(RAW_MARKET_DATA_QUEUE).await {
                        Ok(depth) => self.metrics.queue_depth_messages.with_label_values(&[RAW_MARKET_DATA_QUEUE]).set(depth as f64),
                        Err(e) => warn!(error = %e, queue = RAW_MARKET_DATA_QUEUE, "queue depth poll failed"),
                    }
                }
                next = consumer.next() => {
                    match next {
                        Some(Ok(delivery)) => {
                            let _ = safe_message_consumer(&delivery, RAW_MARKET_DATA_QUEUE, &self.metrics, |payload| self.handle(payload)).await;
                        }
                        Some(Err(e)) => warn!(error = %e, "consumer stream error"),
                        None => {
                            warn!("raw_market_data consumer stream ended");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, payload: Vec<u8>) -> Result<(), ProcessingError> {
        let parsed: serde_json::Value = serde_json::from_slice(&payload).map_err(SchemaError::Json)?;
        let pair = parsed
            .get("pair")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidField {
                field: "pair".to_string(),
                reason: "missing".to_string(),
            })?
            .to_string();
        let candle: Candle = serde_json::from_value(parsed.clone()).map_err(SchemaError::Json)?;

        validate_market_data(&pair, candle.open, candle.high, candle.low, candle.close, candle.volume)?;

        let snapshot = {
            let mut guard = self.indicators.lock().await;
            let state = match guard.entry(pair.clone()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let built = PairIndicators::new().map_err(|e| {
                        ProcessingError::Unexpected(UnexpectedProcessingError(format!("indicator init failed: {e}")))
                    })?;
                    e.insert(built)
                }
            };
            state.update(&candle)
        };

        let (sentiment_score, sentiment_stale) = self.joined_sentiment(&pair, candle.timestamp()).await?;

        let decision = decide(&self.config, &snapshot, sentiment_score, sentiment_stale);

        // Re-read the cache as an entry-confirmation guard: a stale-write
        // race between the signal cacher and this handler must not let a
        // signal that flipped in the interim slip through undetected.
        if decision.should_enter {
            let (confirm_score, confirm_stale) = self.joined_sentiment(&pair, Utc::now()).await?;
            if confirm_stale || confirm_score < self.config.sentiment_buy_threshold {
                self.metrics.signal_age_seconds.with_label_values(&[&pair]).set(0.0);
                return self.maybe_publish_state(&pair, &snapshot, &StrategyDecision { should_enter: false, ..decision }).await;
            }
        }

        self.maybe_publish_state(&pair, &snapshot, &decision).await
    }

    async fn joined_sentiment(&self, pair: &str, as_of: chrono::DateTime<Utc>) -> Result<(f64, bool), ProcessingError> {
        let key = format!("sentiment:{pair}");
        let raw = self.cache.hgetall_json(&key).await?;
        if raw.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return Ok((0.0, true));
        }
        let cached: CachedPairSignal = match serde_json::from_value(raw) {
            Ok(c) => c,
            Err(e) => {
                warn!(pair, error = %e, "malformed cached signal, neutralizing");
                return Ok((0.0, true));
            }
        };
        let age = as_of - cached.timestamp;
        self.metrics
            .signal_age_seconds
            .with_label_values(&[pair])
            .set(age.num_seconds().max(0) as f64);
        let stale = age > ChronoDuration::hours(self.config.sentiment_stale_hours);
        Ok((if stale { 0.0 } else { cached.score }, stale))
    }

    async fn maybe_publish_state(
        &self,
        pair: &str,
        snapshot: &IndicatorSnapshot,
        decision: &StrategyDecision,
    ) -> Result<(), ProcessingError> {
        let key = format!("strategy_state:{pair}");
        let value = json!({
            "indicators": snapshot,
            "decision": decision,
            "updated_at": Utc::now(),
        });
        if let Err(e) = self.cache.hset_json(&key, &value).await {
            warn!(pair, error = %e, "strategy_state write failed, continuing");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts_ms: i64, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp_ms: ts_ms,
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume,
        }
    }

    #[test]
    fn indicator_state_accumulates_across_candles() {
        let mut state = PairIndicators::new().expect("valid periods");
        let mut last = None;
        for i in 0..40 {
            let c = candle(i * 60_000, 100.0 + i as f64, 10.0 + i as f64);
            last = Some(state.update(&c));
        }
        let snapshot = last.unwrap();
        assert!(snapshot.ema_short > 0.0);
        assert!(snapshot.rsi >= 0.0 && snapshot.rsi <= 100.0);
    }

    fn base_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_short: 10.0,
            ema_long: 9.0,
            rsi: 50.0,
            macd: 1.0,
            macd_signal: 0.5,
            bollinger_upper: 200.0,
            bollinger_lower: 50.0,
            volume_mean: 5.0,
            atr: 1.0,
            close: 100.0,
            volume: 10.0,
        }
    }

    fn base_config() -> StrategyJoinConfig {
        StrategyJoinConfig {
            sentiment_buy_threshold: 0.7,
            sentiment_sell_threshold: -0.5,
            sentiment_stale_hours: 4,
        }
    }

    #[test]
    fn exit_condition_trips_on_bearish_sentiment_alone() {
        let decision = decide(&base_config(), &base_snapshot(), -0.6, false);
        assert!(decision.should_exit);
        assert!(!decision.should_enter);
    }

    #[test]
    fn entry_requires_all_confirmations() {
        let decision = decide(&base_config(), &base_snapshot(), 0.8, false);
        assert!(decision.should_enter);
        assert!(!decision.should_exit);
    }

    #[test]
    fn stale_sentiment_blocks_entry_even_when_indicators_align() {
        let decision = decide(&base_config(), &base_snapshot(), 0.8, true);
        assert!(!decision.should_enter);
    }

    #[test]
    fn trend_reversal_trips_exit_independent_of_sentiment() {
        let mut snapshot = base_snapshot();
        snapshot.ema_short = 8.0;
        snapshot.ema_long = 9.0;
        snapshot.rsi = 75.0;
        let decision = decide(&base_config(), &snapshot, 0.1, false);
        assert!(decision.should_exit);
    }
}
