//! API shared state

use std::sync::Arc;

use crate::cache::SnapshotCache;
use crate::scheduler::SchedulerHandle;
use crate::store::TimeSeriesStore;

/// Shared state passed to all API handlers.
///
/// Handlers run concurrently with scheduler ticks and with each other; they
/// read the cache's immutable snapshot reference and go through the store's
/// own synchronized read path, so no extra locking lives here.
#[derive(Clone)]
pub struct ApiState {
    /// Latest-snapshot cache, written by the scheduler after each
    /// successful tick.
    pub cache: SnapshotCache,

    /// Sample store for history queries.
    pub store: Arc<dyn TimeSeriesStore>,

    /// Scheduler handle, used by the health endpoint to report state.
    pub scheduler: SchedulerHandle,
}

impl ApiState {
    pub fn new(
        cache: SnapshotCache,
        store: Arc<dyn TimeSeriesStore>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            cache,
            store,
            scheduler,
        }
    }
}
