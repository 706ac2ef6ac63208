//! Metrics registry shared across the pipeline's five binaries.

pub mod metrics;

pub use metrics::Metrics;
