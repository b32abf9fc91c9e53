//! Sample row definitions and snapshot flattening
//!
//! One persisted row is one metric value attributed to one source at one
//! point in time. Rows are immutable once written; history with gaps (from
//! skipped ticks) is expected and fine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::HardwareSnapshot;

/// Which metric a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Per-core CPU usage percentage; source is the core index.
    CoreUsage,

    /// Memory usage percentage; source is the literal "memory".
    MemoryUsage,

    /// Per-partition disk usage percentage; source is the mountpoint.
    DiskUsage,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::CoreUsage => write!(f, "core_usage"),
            MetricKind::MemoryUsage => write!(f, "memory_usage"),
            MetricKind::DiskUsage => write!(f, "disk_usage"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core_usage" => Ok(MetricKind::CoreUsage),
            "memory_usage" => Ok(MetricKind::MemoryUsage),
            "disk_usage" => Ok(MetricKind::DiskUsage),
            other => Err(format!("unknown metric kind: {other}")),
        }
    }
}

/// Source id used for memory samples, which have no per-entity identity.
pub const MEMORY_SOURCE_ID: &str = "memory";

/// A single persisted metric value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub kind: MetricKind,

    /// Core index, mountpoint, or [`MEMORY_SOURCE_ID`].
    pub source: String,

    pub value: f64,

    /// Capture timestamp of the snapshot this sample came from.
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Flatten a snapshot into its leaf samples: one per logical core, one
    /// for memory usage, one per disk partition. All carry the snapshot's
    /// capture timestamp.
    pub fn from_snapshot(snapshot: &HardwareSnapshot) -> Vec<Sample> {
        let mut samples =
            Vec::with_capacity(snapshot.cpu.usage.len() + 1 + snapshot.disks.len());

        for (core, usage) in snapshot.cpu.usage.iter().enumerate() {
            samples.push(Sample {
                kind: MetricKind::CoreUsage,
                source: core.to_string(),
                value: *usage as f64,
                timestamp: snapshot.captured_at,
            });
        }

        samples.push(Sample {
            kind: MetricKind::MemoryUsage,
            source: MEMORY_SOURCE_ID.to_string(),
            value: snapshot.memory.usage as f64,
            timestamp: snapshot.captured_at,
        });

        for disk in &snapshot.disks {
            samples.push(Sample {
                kind: MetricKind::DiskUsage,
                source: disk.mountpoint.clone(),
                value: disk.usage as f64,
                timestamp: snapshot.captured_at,
            });
        }

        samples
    }
}
