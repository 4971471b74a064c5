//! Committed offset storage for consumer groups.
//!
//! rskafka talks to partitions directly and has no group coordinator, so
//! the group's committed positions are kept here instead of in
//! `__consumer_offsets`. A group with no stored position starts from the
//! earliest retained offset.

use async_trait::async_trait;
use engine_core::Result;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Identifies one committed position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetKey {
    pub group_id: String,
    pub topic: String,
    pub partition: i32,
}

impl OffsetKey {
    pub fn new(group_id: impl Into<String>, topic: impl Into<String>, partition: i32) -> Self {
        Self {
            group_id: group_id.into(),
            topic: topic.into(),
            partition,
        }
    }
}

/// Persistence for committed offsets.
///
/// The stored offset is the next offset to read.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    async fn load(&self, key: &OffsetKey) -> Result<Option<i64>>;
    async fn save(&self, key: &OffsetKey, offset: i64) -> Result<()>;
}

/// Process-local offset store. Positions are lost on restart, so every
/// restart replays from the earliest retained offset.
#[derive(Debug, Default)]
pub struct MemoryOffsetStore {
    offsets: Mutex<HashMap<OffsetKey, i64>>,
}

impl MemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OffsetStore for MemoryOffsetStore {
    async fn load(&self, key: &OffsetKey) -> Result<Option<i64>> {
        Ok(self.offsets.lock().get(key).copied())
    }

    async fn save(&self, key: &OffsetKey, offset: i64) -> Result<()> {
        self.offsets.lock().insert(key.clone(), offset);
        Ok(())
    }
}
