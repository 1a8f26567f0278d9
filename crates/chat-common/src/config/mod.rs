//! Configuration structs

mod gateway_config;

pub use gateway_config::{
    AppSettings, BackoffConfig, ClientProperties, ConfigError, Environment, GatewayConfig,
    QueueConfig, TimeoutConfig,
};
