//! # chat-model
//!
//! Value objects shared by every layer of the gateway client.
//! This crate performs no I/O.

pub mod error;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::ModelError;
pub use value_objects::{Intents, ShardId, Snowflake};
