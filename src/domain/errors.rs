//! Error taxonomy for the pipeline. Each variant here maps to exactly one
//! propagation policy: only `ConfigError` and `FatalStartupError` are allowed
//! to terminate a process; everything else is contained at the point it is
//! raised and logged with context.

use thiserror::Error;

/// Missing or invalid environment configuration. Fail-fast at startup, exit 1.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {name} is not set ({description})")]
    Missing { name: String, description: String },

    #[error("environment variable {name} failed validation: {reason}")]
    Invalid { name: String, reason: String },

    #[error("no valid trading pairs remained after validating TRADING_PAIRS")]
    NoValidPairs,

    #[error("configuration validation failed with {} error(s):\n{}", .0.len(), join_errors(.0))]
    Multiple(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Broker (AMQP) connectivity failed after exhausting bounded retries.
#[derive(Debug, Error)]
pub enum TransientBrokerError {
    #[error("failed to connect to broker after {attempts} attempts: {source}")]
    ConnectFailed {
        attempts: u32,
        #[source]
        source: lapin::Error,
    },

    #[error("broker operation failed: {0}")]
    Operation(#[from] lapin::Error),
}

/// Cache (Redis) connectivity failed after exhausting bounded retries.
#[derive(Debug, Error)]
pub enum TransientCacheError {
    #[error("failed to connect to cache after {attempts} attempts: {source}")]
    ConnectFailed {
        attempts: u32,
        #[source]
        source: redis::RedisError,
    },

    #[error("cache operation failed: {0}")]
    Operation(#[from] redis::RedisError),
}

/// A message failed schema validation. Quarantined via ack-without-requeue.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field {field} failed validation: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source {source_name} has no allowed domain configured")]
    NoAllowedDomain { source_name: String },

    #[error("url domain {domain} is not whitelisted for source {source_name}")]
    DomainMismatch { domain: String, source_name: String },
}

/// Raised by the oracle cascade. Never escapes to the consumer loop: the
/// cascade catches this internally and falls through to the next tier.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("primary oracle request failed: {0}")]
    PrimaryUnavailable(String),

    #[error("primary oracle returned an unparseable response: {0}")]
    PrimaryUnparseable(String),

    #[error("secondary oracle failed: {0}")]
    SecondaryFailed(String),
}

/// Unknown error surfaced from within a consumer callback. Acked (not
/// requeued) to avoid poison-pill loops; logged with full context.
#[derive(Debug, Error)]
#[error("unexpected error processing message: {0}")]
pub struct UnexpectedProcessingError(pub String);

/// Startup-time invariant violated (e.g. cache unreachable at boot).
/// Terminates the process with exit code 1.
#[derive(Debug, Error)]
pub enum FatalStartupError {
    #[error("cache unreachable at startup: {0}")]
    CacheUnreachable(#[source] redis::RedisError),

    #[error("broker unreachable at startup: {0}")]
    BrokerUnreachable(#[source] lapin::Error),

    #[error("configuration invalid at startup: {0}")]
    Config(#[from] ConfigError),
}

/// Umbrella error for a single message-processing attempt, used by consumer
/// loops to decide ack vs. nack-requeue vs. nack-no-requeue in one `match`.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Cache(#[from] TransientCacheError),

    #[error(transparent)]
    Broker(#[from] TransientBrokerError),

    #[error(transparent)]
    Unexpected(#[from] UnexpectedProcessingError),
}

impl ProcessingError {
    /// Whether a message that failed with this error should be requeued.
    /// Schema failures and unexpected errors are poison-pill quarantined
    /// (ack, no requeue); transient broker/cache errors are requeued so a
    /// reconnect can be retried.
    pub fn should_requeue(&self) -> bool {
        matches!(self, ProcessingError::Cache(_) | ProcessingError::Broker(_))
    }
}
