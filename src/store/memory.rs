//! In-memory store (no persistence)
//!
//! Keeps a bounded ring buffer of samples per `(kind, source)` partition.
//! Useful for running without a database file and for exercising the
//! pipeline in tests. All data is lost on restart.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::TimeSeriesStore;
use super::error::StoreResult;
use super::schema::{MetricKind, Sample};

/// Maximum samples retained per partition before the oldest are evicted.
pub const MAX_SAMPLES_PER_PARTITION: usize = 1000;

pub struct MemoryStore {
    partitions: RwLock<HashMap<(MetricKind, String), VecDeque<Sample>>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SAMPLES_PER_PARTITION)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            capacity,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn append(&self, sample: Sample) -> StoreResult<()> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .entry((sample.kind, sample.source.clone()))
            .or_default();

        // Keep the deque sorted by timestamp. Appends normally arrive in
        // time order, so this scan terminates immediately; equal timestamps
        // land after existing ones, preserving insertion order.
        let position = partition
            .iter()
            .rposition(|existing| existing.timestamp <= sample.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        partition.insert(position, sample);

        if partition.len() > self.capacity {
            partition.pop_front();
        }

        Ok(())
    }

    async fn recent(
        &self,
        kind: MetricKind,
        source: &str,
        limit: usize,
    ) -> StoreResult<Vec<Sample>> {
        let partitions = self.partitions.read().await;

        let samples = partitions
            .get(&(kind, source.to_string()))
            .map(|partition| partition.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default();

        Ok(samples)
    }

    async fn prune_before(&self, before: DateTime<Utc>) -> StoreResult<usize> {
        let mut partitions = self.partitions.write().await;

        let mut deleted = 0;
        for partition in partitions.values_mut() {
            while partition
                .front()
                .is_some_and(|sample| sample.timestamp < before)
            {
                partition.pop_front();
                deleted += 1;
            }
        }

        debug!("pruned {deleted} in-memory samples before {before}");
        Ok(deleted)
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
