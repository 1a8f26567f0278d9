//! Value objects - immutable types that represent gateway concepts

mod intents;
mod shard;
mod snowflake;

pub use intents::Intents;
pub use shard::ShardId;
pub use snowflake::Snowflake;
