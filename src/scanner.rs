//! Scanner - assembles consistent hardware snapshots
//!
//! The three sub-queries (CPU, memory, disk) have no data dependency and each
//! may block on a system call of unpredictable latency, so they are issued
//! concurrently and joined under a shared timeout. No partial snapshot is
//! ever published: CPU or memory failure fails the capture, while disk
//! failures only degrade the partition listing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{instrument, trace, warn};

use crate::HardwareSnapshot;
use crate::source::{MetricSource, SourceError};

/// Bounded wait for a full capture. One stuck sub-query fails the capture
/// instead of stalling the pipeline.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Orchestrates concurrent metric sub-queries into a single snapshot.
///
/// Stateless apart from its source handle; it neither caches nor persists.
#[derive(Clone)]
pub struct Scanner {
    source: Arc<dyn MetricSource>,
    capture_timeout: Duration,
}

impl Scanner {
    pub fn new(source: Arc<dyn MetricSource>) -> Self {
        Self {
            source,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }

    pub fn with_timeout(source: Arc<dyn MetricSource>, capture_timeout: Duration) -> Self {
        Self {
            source,
            capture_timeout,
        }
    }

    /// Capture a full hardware snapshot.
    ///
    /// The capture timestamp is assigned once, after all sub-results are in,
    /// so it represents when the snapshot became valid as a whole. This
    /// bounds the skew between CPU, memory and disk readings to the
    /// concurrent wait time.
    #[instrument(skip(self))]
    pub async fn capture(&self) -> Result<HardwareSnapshot, SourceError> {
        let sub_queries = async {
            tokio::join!(
                self.source.cpu_info(),
                self.source.mem_info(),
                self.source.disk_info(),
            )
        };

        let (cpu, memory, disks) = timeout(self.capture_timeout, sub_queries)
            .await
            .map_err(|_| {
                SourceError::Unavailable(format!(
                    "capture timed out after {:?}",
                    self.capture_timeout
                ))
            })?;

        // CPU and memory are fatal; a capture without them is useless.
        let cpu = cpu?;
        let memory = memory?;

        // Disk degrades gracefully: unreadable partitions are dropped from
        // the listing, a totally failed listing becomes an empty one.
        let disks = match disks {
            Ok(scan) => {
                for mountpoint in &scan.unreadable {
                    warn!("skipping unreadable partition {mountpoint}");
                }
                scan.disks
            }
            Err(e) => {
                warn!("disk listing unavailable, continuing without it: {e}");
                Vec::new()
            }
        };

        trace!(
            cores = cpu.logical_cores,
            partitions = disks.len(),
            "capture complete"
        );

        Ok(HardwareSnapshot {
            cpu,
            memory,
            disks,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DiskScan;
    use crate::{CpuSnapshot, DiskSnapshot, MemorySnapshot};
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    /// Scriptable source for exercising the scanner without real hardware.
    struct MockSource {
        cpu: Result<CpuSnapshot, SourceError>,
        memory: Result<MemorySnapshot, SourceError>,
        disks: Result<DiskScan, SourceError>,
        delay: Option<Duration>,
    }

    impl MockSource {
        fn healthy() -> Self {
            Self {
                cpu: Ok(test_cpu()),
                memory: Ok(test_memory()),
                disks: Ok(DiskScan {
                    disks: vec![test_disk("/")],
                    unreadable: vec![],
                }),
                delay: None,
            }
        }
    }

    fn test_cpu() -> CpuSnapshot {
        CpuSnapshot {
            physical_cores: 2,
            logical_cores: 4,
            frequency_mhz: 2400.0,
            usage: vec![10.0, 20.0, 5.0, 99.9],
        }
    }

    fn test_memory() -> MemorySnapshot {
        MemorySnapshot {
            total_mb: 16_000,
            available_mb: 8_000,
            used_mb: 8_000,
            usage: 50.0,
        }
    }

    fn test_disk(mountpoint: &str) -> DiskSnapshot {
        DiskSnapshot {
            mountpoint: mountpoint.to_string(),
            file_system: "ext4".to_string(),
            total_gb: 500,
            used_gb: 200,
            free_gb: 280,
            usage: 41.7,
        }
    }

    #[async_trait]
    impl MetricSource for MockSource {
        async fn cpu_info(&self) -> Result<CpuSnapshot, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.cpu.clone()
        }

        async fn mem_info(&self) -> Result<MemorySnapshot, SourceError> {
            self.memory.clone()
        }

        async fn disk_info(&self) -> Result<DiskScan, SourceError> {
            self.disks.clone()
        }
    }

    #[tokio::test]
    async fn test_capture_preserves_core_order() {
        let scanner = Scanner::new(Arc::new(MockSource::healthy()));

        let snapshot = scanner.capture().await.unwrap();

        assert_eq!(snapshot.cpu.usage, vec![10.0, 20.0, 5.0, 99.9]);
        assert_eq!(snapshot.cpu.usage.len(), snapshot.cpu.logical_cores);
    }

    #[tokio::test]
    async fn test_unreadable_partition_is_omitted_not_fatal() {
        let mut source = MockSource::healthy();
        source.disks = Ok(DiskScan {
            disks: vec![test_disk("/")],
            unreadable: vec!["/mnt/x".to_string()],
        });
        let scanner = Scanner::new(Arc::new(source));

        let snapshot = scanner.capture().await.unwrap();

        assert_eq!(snapshot.disks.len(), 1);
        assert!(snapshot.disks.iter().all(|d| d.mountpoint != "/mnt/x"));
    }

    #[tokio::test]
    async fn test_total_disk_failure_degrades_to_empty_listing() {
        let mut source = MockSource::healthy();
        source.disks = Err(SourceError::Unavailable("disk controller gone".into()));
        let scanner = Scanner::new(Arc::new(source));

        let snapshot = scanner.capture().await.unwrap();

        assert!(snapshot.disks.is_empty());
    }

    #[tokio::test]
    async fn test_cpu_failure_is_fatal() {
        let mut source = MockSource::healthy();
        source.cpu = Err(SourceError::Unavailable("cpu read failed".into()));
        let scanner = Scanner::new(Arc::new(source));

        let result = scanner.capture().await;

        assert_matches!(result, Err(SourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_memory_failure_is_fatal() {
        let mut source = MockSource::healthy();
        source.memory = Err(SourceError::Unavailable("mem read failed".into()));
        let scanner = Scanner::new(Arc::new(source));

        assert!(scanner.capture().await.is_err());
    }

    #[tokio::test]
    async fn test_slow_source_fails_capture_within_bound() {
        let mut source = MockSource::healthy();
        source.delay = Some(Duration::from_secs(60));
        let scanner = Scanner::with_timeout(Arc::new(source), Duration::from_millis(50));

        let result = scanner.capture().await;

        assert_matches!(result, Err(SourceError::Unavailable(msg)) => {
            assert!(msg.contains("timed out"));
        });
    }

    #[tokio::test]
    async fn test_timestamp_assigned_after_sub_queries() {
        let mut source = MockSource::healthy();
        source.delay = Some(Duration::from_millis(50));
        let scanner = Scanner::new(Arc::new(source));

        let before = Utc::now();
        let snapshot = scanner.capture().await.unwrap();
        let after = Utc::now();

        assert!(snapshot.captured_at >= before + chrono::Duration::milliseconds(50));
        assert!(snapshot.captured_at <= after);
    }
}
