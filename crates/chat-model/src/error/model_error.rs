//! Errors raised while constructing value objects

use thiserror::Error;

/// Errors produced by value-object constructors and parsers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A snowflake string was not a decimal integer
    #[error("invalid snowflake format: {0}")]
    InvalidSnowflake(String),

    /// Shard index is out of range for the shard count
    #[error("invalid shard [{index}, {count}]: index must be below a non-zero count")]
    InvalidShard { index: u32, count: u32 },

    /// Intent bits could not be parsed
    #[error("invalid intents value: {0}")]
    InvalidIntents(String),
}
