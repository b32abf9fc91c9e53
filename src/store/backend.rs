//! Time-series store trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreResult;
use super::schema::{MetricKind, Sample};

/// Append-only store of metric samples, queryable by recency.
///
/// Samples are immutable and totally ordered by timestamp within a
/// `(kind, source)` partition, ties broken by insertion order. Writes must be
/// serialized internally per partition but may proceed concurrently across
/// metric kinds; each sample is self-contained, so there is no cross-sample
/// transaction requirement.
///
/// Implementations must be `Send + Sync`; they are shared across the
/// scheduler and concurrent API handlers.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Durably append one sample.
    ///
    /// Fails with [`StoreError::WriteFailed`] on an underlying I/O failure.
    /// The store does not retry; the caller decides retry policy. A failure
    /// here is isolated to this call.
    ///
    /// [`StoreError::WriteFailed`]: super::error::StoreError::WriteFailed
    async fn append(&self, sample: Sample) -> StoreResult<()>;

    /// Up to `limit` most recent samples for `(kind, source)`, newest first.
    ///
    /// Returns an empty vec, not an error, when no samples exist.
    async fn recent(&self, kind: MetricKind, source: &str, limit: usize)
    -> StoreResult<Vec<Sample>>;

    /// Delete samples older than `before` across all partitions.
    ///
    /// Retention enforcement hook, invoked by an external cleanup task.
    /// Returns the number of samples deleted.
    async fn prune_before(&self, before: DateTime<Utc>) -> StoreResult<usize>;

    /// Release underlying resources. Idempotent.
    async fn close(&self) -> StoreResult<()>;
}
