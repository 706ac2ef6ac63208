//! Primary sentiment oracle endpoint configuration. Required only for the
//! sentiment processor.

use crate::config::validator::{self, VarSpec};
use crate::domain::errors::ConfigError;

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub model_name: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl OracleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let specs = [
            VarSpec {
                name: "SENTIMENT_ORACLE_HOST",
                description: "primary sentiment oracle base URL",
                default: Some("http://localhost:11434"),
                validator: validator::starts_with_http,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "SENTIMENT_ORACLE_MODEL",
                description: "primary sentiment oracle model identifier",
                default: Some("mistral:7b"),
                validator: validator::non_empty,
                optional_if: None,
                sensitive: false,
            },
        ];

        let resolved = validator::validate_all(&specs, "oracle")?;

        Ok(Self {
            base_url: validator::get(&resolved, "SENTIMENT_ORACLE_HOST").unwrap(),
            model_name: validator::get(&resolved, "SENTIMENT_ORACLE_MODEL").unwrap(),
            timeout_secs: 30,
            max_retries: 3,
        })
    }
}
