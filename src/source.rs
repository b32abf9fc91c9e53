//! Metric source abstraction over OS-level hardware queries
//!
//! The production implementation reads through `sysinfo`. The trait exists so
//! the scanner and scheduler can be exercised against mock sources in tests.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Disks, System};
use tokio::task;
use tracing::{debug, trace};

use crate::{CpuSnapshot, DiskSnapshot, MemorySnapshot};

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * 1024 * 1024;

/// A metric source could not be read.
///
/// For CPU and memory this is fatal to the whole capture; for disk it
/// degrades to an incomplete partition listing.
#[derive(Debug, Clone)]
pub enum SourceError {
    Unavailable(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unavailable(msg) => write!(f, "metric source unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

/// Result of the disk sub-query.
///
/// Partitions that could not be read are reported by mountpoint instead of
/// failing the listing, so a single unmountable partition never aborts a
/// capture.
#[derive(Debug, Clone, Default)]
pub struct DiskScan {
    pub disks: Vec<DiskSnapshot>,
    pub unreadable: Vec<String>,
}

/// Point-in-time readings of host hardware.
///
/// Implementations may block briefly (CPU usage in particular needs a fixed
/// observation interval) and must be safe to query concurrently.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn cpu_info(&self) -> Result<CpuSnapshot, SourceError>;

    async fn mem_info(&self) -> Result<MemorySnapshot, SourceError>;

    async fn disk_info(&self) -> Result<DiskScan, SourceError>;
}

/// Metric source backed by the `sysinfo` crate.
///
/// Each sub-query runs on the blocking thread pool since `sysinfo` reads
/// synchronously from the OS.
pub struct SysinfoSource {
    /// Observation window for per-core usage percentages. Two refreshes
    /// separated by this interval are required for a meaningful reading.
    cpu_sample_interval: Duration,
}

/// Default CPU usage observation window, matching the 1s sampling interval
/// commonly used for percentage readings.
pub const DEFAULT_CPU_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            cpu_sample_interval: DEFAULT_CPU_SAMPLE_INTERVAL,
        }
    }

    pub fn with_cpu_sample_interval(cpu_sample_interval: Duration) -> Self {
        Self {
            cpu_sample_interval,
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for SysinfoSource {
    async fn cpu_info(&self) -> Result<CpuSnapshot, SourceError> {
        let interval = self
            .cpu_sample_interval
            .max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        task::spawn_blocking(move || {
            let mut sys = System::new();
            sys.refresh_cpu_all();
            // Usage percentages are deltas between two refreshes.
            std::thread::sleep(interval);
            sys.refresh_cpu_all();

            let cpus = sys.cpus();
            if cpus.is_empty() {
                return Err(SourceError::Unavailable(
                    "no CPUs reported by the system".into(),
                ));
            }

            let logical_cores = cpus.len();
            let physical_cores = System::physical_core_count().unwrap_or(logical_cores);
            let frequency_mhz = cpus[0].frequency() as f64;
            let usage = cpus.iter().map(|cpu| cpu.cpu_usage()).collect();

            trace!("read CPU info for {logical_cores} logical cores");

            Ok(CpuSnapshot {
                physical_cores,
                logical_cores,
                frequency_mhz,
                usage,
            })
        })
        .await
        .map_err(|e| SourceError::Unavailable(format!("CPU read task failed: {e}")))?
    }

    async fn mem_info(&self) -> Result<MemorySnapshot, SourceError> {
        task::spawn_blocking(|| {
            let mut sys = System::new();
            sys.refresh_memory();

            let total = sys.total_memory();
            if total == 0 {
                return Err(SourceError::Unavailable(
                    "total memory reported as zero".into(),
                ));
            }

            let used = sys.used_memory();
            let usage = used as f32 / total as f32 * 100.0;

            trace!("read memory info ({} MB total)", total / MB);

            Ok(MemorySnapshot {
                total_mb: total / MB,
                available_mb: sys.available_memory() / MB,
                used_mb: used / MB,
                usage,
            })
        })
        .await
        .map_err(|e| SourceError::Unavailable(format!("memory read task failed: {e}")))?
    }

    async fn disk_info(&self) -> Result<DiskScan, SourceError> {
        task::spawn_blocking(|| {
            let disks = Disks::new_with_refreshed_list();

            let mut seen = HashSet::new();
            let mut scan = DiskScan::default();
            for disk in disks.list() {
                let total = disk.total_space();
                // Pseudo filesystems report zero capacity; they carry no
                // usable usage signal.
                if total == 0 {
                    continue;
                }

                let mountpoint = disk.mount_point().to_string_lossy().to_string();
                // Bind and overlay mounts can list a mountpoint twice.
                if !seen.insert(mountpoint.clone()) {
                    continue;
                }

                let free = disk.available_space();
                let used = total.saturating_sub(free);

                scan.disks.push(DiskSnapshot {
                    mountpoint,
                    file_system: disk.file_system().to_string_lossy().to_string(),
                    total_gb: total / GB,
                    used_gb: used / GB,
                    free_gb: free / GB,
                    usage: used as f32 / total as f32 * 100.0,
                });
            }

            debug!("read disk info for {} partitions", scan.disks.len());

            Ok(scan)
        })
        .await
        .map_err(|e| SourceError::Unavailable(format!("disk read task failed: {e}")))?
    }
}
