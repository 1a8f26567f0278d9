//! Shard identity
//!
//! A shard is one connection's slice of the overall workload, fixed for the
//! connection's lifetime. On the wire it is the two-element array
//! `[index, count]`.

use crate::ModelError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Shard identity `(index, count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardId {
    index: u32,
    count: u32,
}

impl ShardId {
    /// The single shard of an unsharded connection
    pub const ONE: ShardId = ShardId { index: 0, count: 1 };

    /// Create a shard identity, validating `index < count`
    pub fn new(index: u32, count: u32) -> Result<Self, ModelError> {
        if count == 0 || index >= count {
            return Err(ModelError::InvalidShard { index, count });
        }
        Ok(Self { index, count })
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.count
    }
}

impl Default for ShardId {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.index, self.count)
    }
}

impl Serialize for ShardId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [self.index, self.count].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShardId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [index, count] = <[u32; 2]>::deserialize(deserializer)?;
        ShardId::new(index, count).map_err(serde::de::Error::custom)
    }
}
