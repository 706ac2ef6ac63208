//! Broker (AMQP) connection configuration. Required for every service per
//! the core-credentials profile.

use crate::config::validator::{self, VarSpec};
use crate::domain::errors::ConfigError;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl BrokerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let specs = [
            VarSpec {
                name: "BROKER_HOST",
                description: "broker hostname",
                default: Some("rabbitmq"),
                validator: validator::non_empty,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "BROKER_PORT",
                description: "broker port",
                default: Some("5672"),
                validator: validator::valid_port,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "BROKER_USER",
                description: "broker username",
                default: Some("cryptosent"),
                validator: validator::non_empty,
                optional_if: None,
                sensitive: false,
            },
            VarSpec {
                name: "BROKER_PASS",
                description: "broker password",
                default: None,
                validator: password_min_len,
                optional_if: None,
                sensitive: true,
            },
        ];

        let resolved = validator::validate_all(&specs, "broker")?;

        Ok(Self {
            host: validator::get(&resolved, "BROKER_HOST").unwrap(),
            port: validator::get(&resolved, "BROKER_PORT").unwrap().parse().unwrap(),
            user: validator::get(&resolved, "BROKER_USER").unwrap(),
            pass: validator::get(&resolved, "BROKER_PASS").unwrap(),
            max_retries: 5,
            retry_delay_secs: 5,
        })
    }

    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.user, self.pass, self.host, self.port
        )
    }
}

fn password_min_len(v: &str) -> Result<(), String> {
    if v.len() < 8 {
        Err("must be at least 8 characters".to_string())
    } else {
        Ok(())
    }
}
