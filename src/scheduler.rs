//! Scheduler - drives periodic capture-and-persist ticks
//!
//! One actor owns the tick loop; a cloneable handle sends it commands over an
//! mpsc channel. The actor moves through an explicit state machine:
//!
//! ```text
//! Idle --start--> Running --stop--> Stopped --start--> Running ...
//! ```
//!
//! Each tick captures a snapshot, publishes it to the latest-snapshot cache,
//! and appends one sample per leaf value to the store. Ticks run inside the
//! actor's select loop, so at most one capture is ever in flight; a tick that
//! overruns the interval delays the next one rather than overlapping it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, error, instrument, trace, warn};

use crate::cache::SnapshotCache;
use crate::scanner::Scanner;
use crate::store::{Sample, TimeSeriesStore};

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Never started.
    Idle,

    /// Ticking periodically.
    Running,

    /// Stopped; no new ticks start, may be started again.
    Stopped,
}

/// Commands accepted by the scheduler actor.
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Begin periodic ticks at the given interval.
    Start { interval: Duration },

    /// Stop starting new ticks. Any in-flight tick completes on its own.
    Stop,

    /// Run one tick immediately, regardless of state. Used for tests and
    /// manual refresh.
    TickNow {
        respond_to: oneshot::Sender<Result<()>>,
    },

    /// Report the current lifecycle state.
    GetState {
        respond_to: oneshot::Sender<SchedulerState>,
    },

    /// Exit the actor loop.
    Shutdown,
}

pub struct SchedulerActor {
    scanner: Scanner,
    store: Arc<dyn TimeSeriesStore>,
    cache: SnapshotCache,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    state: SchedulerState,
    /// Only polled while Running; rebuilt on every Start.
    ticker: Interval,
}

impl SchedulerActor {
    pub fn new(
        scanner: Scanner,
        store: Arc<dyn TimeSeriesStore>,
        cache: SnapshotCache,
        command_rx: mpsc::Receiver<SchedulerCommand>,
    ) -> Self {
        Self {
            scanner,
            store,
            cache,
            command_rx,
            state: SchedulerState::Idle,
            ticker: time::interval(Duration::from_secs(15)),
        }
    }

    /// Run the actor's main loop until shutdown or channel closure.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting scheduler actor");

        loop {
            tokio::select! {
                // Only armed while Running. The tick itself is awaited here,
                // so the next ticker fire cannot race an in-flight capture.
                _ = self.ticker.tick(), if self.state == SchedulerState::Running => {
                    if let Err(e) = self.run_tick().await {
                        warn!("tick skipped: {e:#}");
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::Start { interval }) => {
                            self.handle_start(interval);
                        }

                        Some(SchedulerCommand::Stop) => {
                            debug!("stopping periodic ticks");
                            self.state = SchedulerState::Stopped;
                        }

                        Some(SchedulerCommand::TickNow { respond_to }) => {
                            debug!("received TickNow command");
                            let result = self.run_tick().await;
                            let _ = respond_to.send(result);
                        }

                        Some(SchedulerCommand::GetState { respond_to }) => {
                            let _ = respond_to.send(self.state);
                        }

                        Some(SchedulerCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("scheduler actor stopped");
    }

    fn handle_start(&mut self, interval: Duration) {
        if self.state == SchedulerState::Running {
            trace!("already running, restarting ticker with {interval:?}");
        } else {
            debug!("starting periodic ticks every {interval:?}");
        }

        let mut ticker = time::interval(interval);
        // An overrunning capture delays the next tick instead of bursting
        // to catch up; tick starts stay wall-clock-periodic otherwise.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.ticker = ticker;
        self.state = SchedulerState::Running;
    }

    /// One capture-and-persist cycle.
    ///
    /// A fatal capture failure skips the whole tick: nothing is cached and
    /// nothing is written, so dashboards see a gap rather than a partial
    /// snapshot. Individual append failures are logged and do not abort the
    /// remaining samples.
    async fn run_tick(&mut self) -> Result<()> {
        let snapshot = self
            .scanner
            .capture()
            .await
            .context("capture failed, no samples written for this tick")?;

        let samples = Sample::from_snapshot(&snapshot);
        self.cache.publish(snapshot).await;

        let mut failed = 0usize;
        let total = samples.len();
        for sample in samples {
            if let Err(e) = self.store.append(sample).await {
                // Isolated per sample; the store does not retry and neither
                // do we within a tick.
                error!("failed to append sample: {e}");
                failed += 1;
            }
        }

        if failed > 0 {
            warn!("tick persisted {}/{total} samples", total - failed);
        } else {
            trace!("tick persisted {total} samples");
        }

        Ok(())
    }
}

/// Handle for controlling a [`SchedulerActor`].
///
/// Cloneable; all clones talk to the same actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Spawn the scheduler actor in Idle state and return its handle.
    pub fn spawn(
        scanner: Scanner,
        store: Arc<dyn TimeSeriesStore>,
        cache: SnapshotCache,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = SchedulerActor::new(scanner, store, cache, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn start(&self, interval: Duration) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Start { interval })
            .await
            .context("failed to send Start command")
    }

    pub async fn stop(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Stop)
            .await
            .context("failed to send Stop command")
    }

    /// Trigger an immediate tick and wait for its outcome.
    pub async fn tick_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        rx.await.context("scheduler dropped the response")?
    }

    pub async fn state(&self) -> Result<SchedulerState> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::GetState { respond_to: tx })
            .await
            .context("failed to send GetState command")?;

        rx.await.context("scheduler dropped the response")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DiskScan, MetricSource, SourceError};
    use crate::store::{MemoryStore, MetricKind};
    use crate::{CpuSnapshot, MemorySnapshot};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Source whose CPU read can be flipped to failing mid-test.
    struct ToggleSource {
        cpu_failing: AtomicBool,
    }

    impl ToggleSource {
        fn new() -> Self {
            Self {
                cpu_failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl MetricSource for ToggleSource {
        async fn cpu_info(&self) -> Result<CpuSnapshot, SourceError> {
            if self.cpu_failing.load(Ordering::SeqCst) {
                return Err(SourceError::Unavailable("cpu gone".into()));
            }
            Ok(CpuSnapshot {
                physical_cores: 2,
                logical_cores: 4,
                frequency_mhz: 2400.0,
                usage: vec![10.0, 20.0, 5.0, 99.9],
            })
        }

        async fn mem_info(&self) -> Result<MemorySnapshot, SourceError> {
            Ok(MemorySnapshot {
                total_mb: 16_000,
                available_mb: 8_000,
                used_mb: 8_000,
                usage: 50.0,
            })
        }

        async fn disk_info(&self) -> Result<DiskScan, SourceError> {
            Ok(DiskScan::default())
        }
    }

    fn pipeline() -> (Arc<ToggleSource>, Arc<MemoryStore>, SnapshotCache, SchedulerHandle) {
        let source = Arc::new(ToggleSource::new());
        let store = Arc::new(MemoryStore::new());
        let cache = SnapshotCache::new();
        let scanner = Scanner::new(source.clone());
        let handle = SchedulerHandle::spawn(scanner, store.clone(), cache.clone());
        (source, store, cache, handle)
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let (_, _, _, handle) = pipeline();

        assert_eq!(handle.state().await.unwrap(), SchedulerState::Idle);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_and_stop_transitions() {
        let (_, _, _, handle) = pipeline();

        handle.start(Duration::from_secs(60)).await.unwrap();
        assert_eq!(handle.state().await.unwrap(), SchedulerState::Running);

        handle.stop().await.unwrap();
        assert_eq!(handle.state().await.unwrap(), SchedulerState::Stopped);

        // Stopped can start again.
        handle.start(Duration::from_secs(60)).await.unwrap();
        assert_eq!(handle.state().await.unwrap(), SchedulerState::Running);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_tick_persists_one_sample_per_leaf_value() {
        let (_, store, cache, handle) = pipeline();

        handle.tick_now().await.unwrap();

        // 4 cores with matching source ids 0-3.
        for (core, expected) in [(0, 10.0), (1, 20.0), (2, 5.0), (3, 99.9f32 as f64)] {
            let samples = store
                .recent(MetricKind::CoreUsage, &core.to_string(), 10)
                .await
                .unwrap();
            assert_eq!(samples.len(), 1, "core {core}");
            assert_eq!(samples[0].value, expected, "core {core}");
        }

        let memory = store
            .recent(MetricKind::MemoryUsage, "memory", 10)
            .await
            .unwrap();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory[0].value, 50.0);

        assert!(cache.latest().await.is_some());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_capture_skips_tick_and_keeps_prior_snapshot() {
        let (source, store, cache, handle) = pipeline();

        handle.tick_now().await.unwrap();
        let prior = cache.latest().await.unwrap();

        source.cpu_failing.store(true, Ordering::SeqCst);
        let result = handle.tick_now().await;
        assert!(result.is_err());

        // No partial writes for the failed tick and the cached snapshot is
        // untouched.
        let memory = store
            .recent(MetricKind::MemoryUsage, "memory", 10)
            .await
            .unwrap();
        assert_eq!(memory.len(), 1);
        assert!(Arc::ptr_eq(&prior, &cache.latest().await.unwrap()));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_periodic_ticks_write_samples() {
        let (_, store, _, handle) = pipeline();

        handle.start(Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.stop().await.unwrap();

        let samples = store
            .recent(MetricKind::MemoryUsage, "memory", 100)
            .await
            .unwrap();
        assert!(
            samples.len() >= 2,
            "expected at least two periodic ticks, got {}",
            samples.len()
        );

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_ticks_after_stop() {
        let (_, store, _, handle) = pipeline();

        handle.start(Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.stop().await.unwrap();

        let before = store
            .recent(MetricKind::MemoryUsage, "memory", 100)
            .await
            .unwrap()
            .len();

        tokio::time::sleep(Duration::from_millis(80)).await;

        let after = store
            .recent(MetricKind::MemoryUsage, "memory", 100)
            .await
            .unwrap()
            .len();
        assert_eq!(before, after);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let (_, _, _, handle) = pipeline();

        handle.shutdown().await.unwrap();
        // Give the actor a moment to exit and drop the receiver.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(handle.tick_now().await.is_err());
    }
}
