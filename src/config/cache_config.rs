//! Cache (Redis) connection configuration. Required for the signal cacher
//! and the strategy join.

use crate::config::validator::{self, VarSpec};
use crate::domain::errors::ConfigError;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    /// `0` means no expiry.
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let specs = [
            VarSpec {
                name: "CACHE_HOST",
                description: "cache hostname",
                default: Some("redis"),
                validator: validator::non_empty,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "CACHE_PORT",
                description: "cache port",
                default: Some("6379"),
                validator: validator::valid_port,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "SIGNAL_CACHE_TTL",
                description: "signal cache TTL in seconds (0 = no expiry)",
                default: Some("0"),
                validator: non_negative_int,
                optional_if: None,
                sensitive: false,
            },
        ];

        let resolved = validator::validate_all(&specs, "cache")?;

        Ok(Self {
            host: validator::get(&resolved, "CACHE_HOST").unwrap(),
            port: validator::get(&resolved, "CACHE_PORT").unwrap().parse().unwrap(),
            max_retries: 5,
            retry_delay_secs: 2,
            ttl_seconds: validator::get(&resolved, "SIGNAL_CACHE_TTL").unwrap().parse().unwrap(),
        })
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

fn non_negative_int(v: &str) -> Result<(), String> {
    v.parse::<u64>().map(|_| ()).map_err(|_| "must be a non-negative integer".to_string())
}
