// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use tracing::info;

use crate::IngestError;

/// Position of one worker in a sweep of `count` workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardSpec {
    index: usize,
    count: usize,
}

impl ShardSpec {
    pub fn new(index: usize, count: usize) -> Result<Self, IngestError> {
        if count < 1 || index >= count {
            return Err(IngestError::InvalidShard { index, count });
        }
        Ok(Self { index, count })
    }

    #[must_use]
    pub const fn single() -> Self {
        Self { index: 0, count: 1 }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn count(self) -> usize {
        self.count
    }

    /// Whether the item at `position` in the sorted list belongs here.
    #[must_use]
    pub const fn owns(self, position: usize) -> bool {
        position % self.count == self.index
    }
}

impl Default for ShardSpec {
    fn default() -> Self {
        Self::single()
    }
}

/// Assigns items to shards by position in their sorted order. Assignment is
/// a pure function of the sorted list, so workers need no coordination.
#[derive(Debug, Clone)]
pub struct ShardPartitioner<T> {
    shard: ShardSpec,
    total: usize,
    assigned: Vec<T>,
}

impl<T: Ord> ShardPartitioner<T> {
    #[must_use]
    pub fn new(mut items: Vec<T>, shard: ShardSpec) -> Self {
        items.sort();
        let total = items.len();
        let assigned: Vec<T> = items
            .into_iter()
            .enumerate()
            .filter(|(position, _)| shard.owns(*position))
            .map(|(_, item)| item)
            .collect();
        info!(
            shard_index = shard.index(),
            shard_count = shard.count(),
            assigned = assigned.len(),
            total,
            "shard partitioned"
        );
        Self {
            shard,
            total,
            assigned,
        }
    }

    #[must_use]
    pub fn shard(&self) -> ShardSpec {
        self.shard
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn assigned(&self) -> &[T] {
        &self.assigned
    }

    #[must_use]
    pub fn into_assigned(self) -> Vec<T> {
        self.assigned
    }
}
