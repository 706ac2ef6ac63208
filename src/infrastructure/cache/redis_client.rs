//! Redis-backed cache client. A failed ping at startup is fatal: the signal
//! cacher and strategy join both refuse to start without a reachable cache.

use crate::config::CacheConfig;
use crate::domain::errors::TransientCacheError;
use crate::domain::ports::CacheStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{info, warn};

pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connects and pings, retrying per `config.max_retries`. Returns an
    /// error only after every attempt is exhausted — callers should treat
    /// that as fatal at startup.
    pub async fn connect(config: &CacheConfig) -> Result<Self, TransientCacheError> {
        let url = config.redis_url();
        let mut last_err = None;
        for attempt in 1..=config.max_retries {
            match redis::Client::open(url.clone()) {
                Ok(client) => match client.get_connection_manager().await {
                    Ok(mut manager) => match redis::cmd("PING").query_async::<String>(&mut manager).await {
                        Ok(_) => {
                            info!(attempt, "connected to cache");
                            return Ok(Self { manager });
                        }
                        Err(e) => last_err = Some(e),
                    },
                    Err(e) => last_err = Some(e),
                },
                Err(e) => last_err = Some(e),
            }
            warn!(attempt, "cache connection attempt failed");
            if attempt < config.max_retries {
                tokio::time::sleep(std::time::Duration::from_secs(config.retry_delay_secs)).await;
            }
        }
        Err(TransientCacheError::ConnectFailed {
            attempts: config.max_retries,
            source: last_err.expect("at least one attempt recorded"),
        })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn ping(&self) -> Result<(), TransientCacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// `ttl_seconds == 0` writes with a plain `SET`; otherwise `SETEX` sets
    /// the value and expiry atomically, matching the original's
    /// `set_json`/`setex` branch.
    async fn set_json(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<(), TransientCacheError> {
        let mut conn = self.manager.clone();
        let encoded = serde_json::to_string(value).expect("Value always serializes");
        if ttl_seconds > 0 {
            conn.set_ex::<_, _, ()>(key, encoded, ttl_seconds).await?;
        } else {
            conn.set::<_, _, ()>(key, encoded).await?;
        }
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Value, TransientCacheError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(match raw {
            Some(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
            None => Value::Null,
        })
    }

    /// Writes every top-level key of `fields` as one hash field, each value
    /// JSON-encoded so numbers and strings round-trip through `hgetall_json`.
    async fn hset_json(&self, key: &str, fields: &Value) -> Result<(), TransientCacheError> {
        let object = fields.as_object().ok_or_else(|| {
            TransientCacheError::Operation(redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "hset_json requires a JSON object",
            )))
        })?;
        let mut conn = self.manager.clone();
        let pairs: Vec<(String, String)> = object
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::to_string(v).expect("Value always serializes")))
            .collect();
        conn.hset_multiple::<_, _, _, ()>(key, &pairs).await?;
        Ok(())
    }

    async fn hgetall_json(&self, key: &str) -> Result<Value, TransientCacheError> {
        let mut conn = self.manager.clone();
        let raw: std::collections::HashMap<String, String> = conn.hgetall(key).await?;
        let mut out = serde_json::Map::with_capacity(raw.len());
        for (field, s) in raw {
            let v = serde_json::from_str(&s).unwrap_or(Value::String(s));
            out.insert(field, v);
        }
        Ok(Value::Object(out))
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), TransientCacheError> {
        let mut conn = self.manager.clone();
        conn.lpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> Result<(), TransientCacheError> {
        let mut conn = self.manager.clone();
        conn.ltrim::<_, ()>(key, start, stop).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), TransientCacheError> {
        if seconds == 0 {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        conn.expire::<_, ()>(key, seconds as i64).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, TransientCacheError> {
        let mut conn = self.manager.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, TransientCacheError> {
        let mut conn = self.manager.clone();
        let count: i64 = conn.exists(key).await?;
        Ok(count > 0)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, TransientCacheError> {
        let mut conn = self.manager.clone();
        let matched: Vec<String> = conn.keys(pattern).await?;
        Ok(matched)
    }
}
