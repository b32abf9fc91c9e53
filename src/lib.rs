pub mod api;
pub mod cache;
pub mod config;
pub mod scanner;
pub mod scheduler;
pub mod source;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One internally time-consistent capture of all tracked hardware metrics.
///
/// All three sub-snapshots are collected as a single unit and share
/// `captured_at`, which is assigned once after the full capture is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    pub cpu: CpuSnapshot,
    pub memory: MemorySnapshot,
    pub disks: Vec<DiskSnapshot>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub physical_cores: usize,
    pub logical_cores: usize,
    pub frequency_mhz: f64,
    /// Per-core usage percentages, ordered by core index.
    /// Always `logical_cores` entries, each in [0, 100].
    pub usage: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total_mb: u64,
    pub available_mb: u64,
    pub used_mb: u64,
    pub usage: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSnapshot {
    /// Unique within a snapshot.
    pub mountpoint: String,
    pub file_system: String,
    pub total_gb: u64,
    pub used_gb: u64,
    pub free_gb: u64,
    pub usage: f32,
}
