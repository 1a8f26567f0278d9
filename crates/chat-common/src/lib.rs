//! # chat-common
//!
//! Shared utilities for the gateway client: configuration and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    AppSettings, BackoffConfig, ClientProperties, ConfigError, Environment, GatewayConfig,
    QueueConfig, TimeoutConfig,
};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
