//! Activity counters and snapshots for a pool

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time snapshot of a pool's activity.
///
/// Gauges (`idle_resources`, `outstanding_resources`) are read together
/// under the pool lock; the monotonic counters are relaxed atomics and may
/// trail concurrent activity by a step. Advisory data, not a basis for
/// correctness decisions.
///
/// # Examples
///
/// ```no_run
/// # use respool::{BoundedPool, PoolConfig, ResourceManager};
/// # async fn demo<M: ResourceManager>(pool: &BoundedPool<M>) {
/// let stats = pool.stats();
/// println!(
///     "{}/{} in use, {} created so far",
///     stats.outstanding_resources, stats.max_capacity, stats.created,
/// );
/// # }
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStats {
    /// Entries currently sitting in the free-list.
    pub idle_resources: usize,

    /// Resources checked out (including slots reserved for in-flight
    /// creation).
    pub outstanding_resources: usize,

    /// Configured capacity bound.
    pub max_capacity: usize,

    /// Resources the factory has created.
    pub created: usize,

    /// Resources handed to the closer, for any reason.
    pub destroyed: usize,

    /// Resources closed by the idle-eviction task specifically.
    pub evicted: usize,

    /// Idle entries that failed their health check on acquire.
    pub health_failures: usize,

    /// Acquire attempts rejected because the pool was at capacity.
    pub exhausted_events: usize,
}

/// Relaxed counters shared between the pool, its eviction task, and
/// in-flight operations.
#[derive(Default)]
pub(crate) struct StatsTracker {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub evicted: AtomicUsize,
    pub health_failures: AtomicUsize,
    pub exhausted_events: AtomicUsize,
}

impl StatsTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, idle: usize, outstanding: usize, max_capacity: usize) -> PoolStats {
        PoolStats {
            idle_resources: idle,
            outstanding_resources: outstanding,
            max_capacity,
            created: self.created.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            health_failures: self.health_failures.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
        }
    }
}
