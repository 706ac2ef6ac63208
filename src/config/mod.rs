//! Configuration bootstrap. Each service assembles only the config structs
//! it needs; `validator` underlies all of them and fails fast with every
//! accumulated error before a service does any I/O.

pub mod broker_config;
pub mod cache_config;
pub mod oracle_config;
pub mod pipeline_config;
pub mod validator;

pub use broker_config::BrokerConfig;
pub use cache_config::CacheConfig;
pub use oracle_config::OracleConfig;
pub use pipeline_config::PipelineConfig;
