//! Hexagonal port traits: the boundaries application services code against,
//! implemented concretely under `infrastructure`. Kept small and centered on
//! what each component actually calls, following the same async-trait
//! boundary style used for market-data/execution adapters elsewhere in this
//! codebase.

use crate::domain::entities::Candle;
use crate::domain::errors::{OracleError, TransientBrokerError, TransientCacheError};
use async_trait::async_trait;
use serde_json::Value;

/// One parsed feed entry, prior to dedup/relevance/publish decisions.
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// The exchange's OHLCV stream, treated as an opaque collaborator: only the
/// shape needed to drive the market streamer's per-pair dedup loop is named
/// here, not how the exchange client itself talks to the wire.
#[async_trait]
pub trait ExchangeCandleSource: Send + Sync {
    /// Blocks until the next batch of candles is available for `pair`.
    /// Returns an empty vec on a quiet tick (no error).
    async fn next_candles(&self, pair: &str) -> anyhow::Result<Vec<Candle>>;
}

/// One named RSS feed the poller fetches each cycle.
#[async_trait]
pub trait NewsFeedSource: Send + Sync {
    /// Stable name for this feed, matching the source whitelist.
    fn source_name(&self) -> &str;

    async fn fetch(&self) -> anyhow::Result<Vec<FeedEntry>>;
}

/// A text → sentiment-score oracle. The primary tier of the cascade
/// implements this against an opaque financial sentiment model reached over
/// HTTP; the fallback tiers are plain functions, not oracles, because they
/// never fail.
#[async_trait]
pub trait SentimentOracle: Send + Sync {
    /// Oracle's own name, used as the `model` tag when it succeeds.
    fn name(&self) -> &str;

    async fn score(&self, text: &str) -> Result<f64, OracleError>;
}

/// Optional queue-declare arguments. `Default::default()` declares a plain
/// unbounded durable queue, matching every queue this pipeline currently
/// uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueArgs {
    /// `x-max-length`: caps the queue depth; the broker drops the oldest
    /// message on overflow rather than blocking the publisher.
    pub max_length: Option<i64>,
    /// `x-message-ttl`, in milliseconds.
    pub message_ttl_ms: Option<i64>,
}

/// A durable, JSON-payload message broker queue boundary.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// `args` carries optional queue arguments (e.g. `x-max-length`,
    /// `x-message-ttl`) the same way the prior implementation's
    /// `declare_queue(..., arguments=...)` did, left empty by every queue
    /// this pipeline currently declares.
    async fn declare_queue(
        &self,
        queue: &str,
        durable: bool,
        args: QueueArgs,
    ) -> Result<(), TransientBrokerError>;

    async fn publish(
        &self,
        queue: &str,
        payload: &Value,
        persistent: bool,
    ) -> Result<(), TransientBrokerError>;

    /// Ensures the underlying connection/channel is open, reopening if the
    /// broker closed it out from under us.
    async fn ensure_connection(&self) -> Result<(), TransientBrokerError>;

    /// Ready-message count for `queue`, via a passive (non-mutating) declare.
    async fn queue_depth(&self, queue: &str) -> Result<u32, TransientBrokerError>;
}

/// The cache boundary used by the signal cacher and the strategy join.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn ping(&self) -> Result<(), TransientCacheError>;

    /// Stores a JSON-serializable value under a plain string key. `ttl_seconds`
    /// of `0` means no expiry, applied atomically via `SETEX` otherwise.
    async fn set_json(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), TransientCacheError>;

    /// Retrieves and JSON-decodes a plain string key, returning `Value::Null`
    /// if the key is absent.
    async fn get_json(&self, key: &str) -> Result<Value, TransientCacheError>;

    async fn hset_json(&self, key: &str, fields: &Value) -> Result<(), TransientCacheError>;

    async fn hgetall_json(&self, key: &str) -> Result<Value, TransientCacheError>;

    async fn lpush(&self, key: &str, value: &str) -> Result<(), TransientCacheError>;

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<(), TransientCacheError>;

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), TransientCacheError>;

    /// Deletes a key, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, TransientCacheError>;

    /// Whether a key currently exists.
    async fn exists(&self, key: &str) -> Result<bool, TransientCacheError>;

    /// Lists all keys matching a glob-style pattern (e.g. `sentiment:*`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, TransientCacheError>;
}
