//! The capability contract and the bounded pool implementation

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::errors::{PoolError, PoolResult};
use crate::manager::ResourceManager;
use crate::stats::{PoolStats, StatsTracker};

/// Shortest interval the idle-eviction task will run at.
const REAP_INTERVAL_FLOOR: Duration = Duration::from_millis(25);

/// Capability contract every pool implementation satisfies.
///
/// Callers that only acquire and return handles can stay agnostic of the
/// concrete pool type behind it. All operations are safe under concurrent
/// invocation and none of them waits for capacity: `acquire` on a full pool
/// fails immediately with [`PoolError::Exhausted`].
#[async_trait]
pub trait Pool: Send + Sync {
    /// Handle type this pool manages.
    type Resource: Send;

    /// Check a resource out of the pool, creating one if the free-list is
    /// empty and capacity allows.
    async fn acquire(&self) -> PoolResult<Self::Resource>;

    /// Return a previously acquired resource.
    ///
    /// Every successful `acquire` must be paired with a `release` or a
    /// [`discard`](Pool::discard); a resource that is never returned stays
    /// counted against capacity forever. The pool does not enforce this.
    async fn release(&self, resource: Self::Resource) -> PoolResult<()>;

    /// Tear down a resource the caller knows to be broken, bypassing the
    /// free-list.
    async fn discard(&self, resource: Self::Resource) -> PoolResult<()>;

    /// Close the pool: destroy all idle resources and refuse further
    /// acquisition. Idempotent. Outstanding resources are destroyed as
    /// their holders return them.
    async fn drain(&self);

    /// Current free-list length. Advisory: the value may be stale by the
    /// time the caller looks at it.
    fn size(&self) -> usize;
}

struct IdleEntry<T> {
    resource: T,
    returned_at: Instant,
}

struct PoolState<T> {
    free: VecDeque<IdleEntry<T>>,
    /// Resources checked out, plus slots reserved for in-flight creation
    /// and idle entries held out for validation. Together with the
    /// free-list this never exceeds `max_capacity`.
    outstanding: usize,
    closed: bool,
}

impl<T> PoolState<T> {
    fn tracked(&self) -> usize {
        self.outstanding + self.free.len()
    }
}

enum AcquireStep<T> {
    Validate(T),
    Create,
}

/// Bounded pool of lazily created resources.
///
/// Resources come from a [`ResourceManager`] and live on a LIFO free-list
/// while idle: the most-recently-returned resource is handed out first, so
/// hot handles stay in circulation and stale ones age toward eviction. A
/// background task closes entries idle longer than
/// [`idle_timeout`](PoolConfig::idle_timeout), never shrinking the pool
/// below [`initial_capacity`](PoolConfig::initial_capacity) resources.
///
/// Construction validates the capacity configuration and spawns the
/// eviction task, so it must happen inside a Tokio runtime.
pub struct BoundedPool<M: ResourceManager> {
    manager: Arc<M>,
    config: PoolConfig,
    state: Arc<Mutex<PoolState<M::Resource>>>,
    stats: Arc<StatsTracker>,
    shutdown: Arc<Notify>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<M: ResourceManager> BoundedPool<M> {
    /// Create an empty pool. No resources are created until the first
    /// `acquire` (or an explicit [`warm_up`](BoundedPool::warm_up)).
    pub fn new(config: PoolConfig, manager: M) -> PoolResult<Self> {
        config.validate()?;
        let manager = Arc::new(manager);
        let state = Arc::new(Mutex::new(PoolState {
            free: VecDeque::new(),
            outstanding: 0,
            closed: false,
        }));
        let stats = StatsTracker::new();
        let shutdown = Arc::new(Notify::new());
        let reaper = spawn_reaper(
            Arc::downgrade(&state),
            Arc::clone(&manager),
            Arc::clone(&stats),
            Arc::clone(&shutdown),
            config.clone(),
        );
        Ok(Self {
            manager,
            config,
            state,
            stats,
            shutdown,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Pre-create resources until the pool tracks `initial_capacity` of
    /// them, mirroring an eager-fill construction without forcing it on
    /// every caller. Returns how many resources were created.
    ///
    /// Stops early with the factory's error if creation fails; resources
    /// already placed on the free-list stay there.
    pub async fn warm_up(&self) -> PoolResult<usize> {
        let mut added = 0;
        loop {
            {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(PoolError::Closed);
                }
                if state.tracked() >= self.config.initial_capacity {
                    break;
                }
                state.outstanding += 1;
            }
            match self.manager.create().await {
                Ok(resource) => {
                    StatsTracker::bump(&self.stats.created);
                    let rejected = {
                        let mut state = self.state.lock();
                        state.outstanding -= 1;
                        if state.closed {
                            Some(resource)
                        } else {
                            state.free.push_back(IdleEntry {
                                resource,
                                returned_at: Instant::now(),
                            });
                            None
                        }
                    };
                    match rejected {
                        Some(resource) => {
                            self.close_logged(resource, "warm-up after drain").await;
                            return Err(PoolError::Closed);
                        }
                        None => added += 1,
                    }
                }
                Err(err) => {
                    self.state.lock().outstanding -= 1;
                    return Err(PoolError::backend(err));
                }
            }
        }
        Ok(added)
    }

    /// Snapshot the pool's gauges and activity counters.
    pub fn stats(&self) -> PoolStats {
        let (idle, outstanding) = {
            let state = self.state.lock();
            (state.free.len(), state.outstanding)
        };
        self.stats.snapshot(idle, outstanding, self.config.max_capacity)
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    async fn close_logged(&self, resource: M::Resource, context: &'static str) {
        StatsTracker::bump(&self.stats.destroyed);
        if let Err(err) = self.manager.close(resource).await {
            warn!(context, error = %err, "closer failed, resource dropped");
        }
    }
}

#[async_trait]
impl<M: ResourceManager> Pool for BoundedPool<M> {
    type Resource = M::Resource;

    async fn acquire(&self) -> PoolResult<M::Resource> {
        // Retries after a failed health check are capped at the free-list
        // length observed on the first pass, so a stream of broken idle
        // entries can never loop unboundedly.
        let mut idle_budget: Option<usize> = None;
        loop {
            let step = {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(PoolError::Closed);
                }
                let budget = idle_budget.get_or_insert(state.free.len());
                if *budget > 0
                    && let Some(entry) = state.free.pop_back()
                {
                    *budget -= 1;
                    state.outstanding += 1;
                    AcquireStep::Validate(entry.resource)
                } else if state.tracked() < self.config.max_capacity {
                    state.outstanding += 1;
                    AcquireStep::Create
                } else {
                    StatsTracker::bump(&self.stats.exhausted_events);
                    return Err(PoolError::Exhausted);
                }
            };
            match step {
                AcquireStep::Validate(resource) => {
                    match self.manager.validate(&resource).await {
                        Ok(()) => return Ok(resource),
                        Err(err) => {
                            StatsTracker::bump(&self.stats.health_failures);
                            debug!(error = %err, "idle resource failed health check, replacing");
                            self.close_logged(resource, "health check").await;
                            self.state.lock().outstanding -= 1;
                        }
                    }
                }
                AcquireStep::Create => match self.manager.create().await {
                    Ok(resource) => {
                        StatsTracker::bump(&self.stats.created);
                        return Ok(resource);
                    }
                    Err(err) => {
                        // Hand the reserved slot back before reporting.
                        self.state.lock().outstanding -= 1;
                        return Err(PoolError::backend(err));
                    }
                },
            }
        }
    }

    async fn release(&self, resource: M::Resource) -> PoolResult<()> {
        let rejected = {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            if state.closed {
                Some(resource)
            } else {
                state.free.push_back(IdleEntry {
                    resource,
                    returned_at: Instant::now(),
                });
                None
            }
        };
        match rejected {
            Some(resource) => {
                self.close_logged(resource, "release after drain").await;
                Err(PoolError::Closed)
            }
            None => Ok(()),
        }
    }

    async fn discard(&self, resource: M::Resource) -> PoolResult<()> {
        {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
        }
        StatsTracker::bump(&self.stats.destroyed);
        self.manager
            .close(resource)
            .await
            .map_err(PoolError::backend)
    }

    async fn drain(&self) {
        let drained = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.free)
        };
        // Wind the eviction task down and wait for it. A sweep caught
        // mid-batch gets to finish its closer calls; aborting here could
        // drop popped resources without the closer ever completing.
        let handle = self.reaper.lock().take();
        if let Some(handle) = handle {
            self.shutdown.notify_one();
            if let Err(err) = handle.await
                && !err.is_cancelled()
            {
                warn!(error = %err, "eviction task ended abnormally");
            }
        }
        let resources: Vec<_> = drained.into_iter().map(|entry| entry.resource).collect();
        let closed = resources.len();
        close_batch(self.manager.as_ref(), &self.stats, resources, "drain").await;
        debug!(closed, "pool drained");
    }

    fn size(&self) -> usize {
        self.state.lock().free.len()
    }
}

impl<M: ResourceManager> Drop for BoundedPool<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.lock().take() {
            handle.abort();
        }
    }
}

/// Close a set of resources, accumulating closer failures and surfacing
/// them as one log record once the whole batch has been attempted.
async fn close_batch<M: ResourceManager>(
    manager: &M,
    stats: &StatsTracker,
    resources: Vec<M::Resource>,
    context: &'static str,
) {
    let mut failures = Vec::new();
    for resource in resources {
        StatsTracker::bump(&stats.destroyed);
        if let Err(err) = manager.close(resource).await {
            failures.push(err);
        }
    }
    if !failures.is_empty() {
        for err in &failures {
            debug!(context, error = %err, "closer failure");
        }
        warn!(context, failed = failures.len(), "closer reported errors during batch teardown");
    }
}

/// Background task trimming idle entries older than the configured timeout.
///
/// Ticks at half the idle timeout (floored at 25ms), takes the same lock as
/// acquire/release for each sweep, and never shrinks tracked resources
/// below `initial_capacity`. Holds only a weak handle to the pool state.
/// The shutdown notification is only observed between sweeps, so a batch of
/// closer calls already in flight always runs to completion before the task
/// exits; `drain` relies on that by awaiting the handle.
fn spawn_reaper<M: ResourceManager>(
    state: Weak<Mutex<PoolState<M::Resource>>>,
    manager: Arc<M>,
    stats: Arc<StatsTracker>,
    shutdown: Arc<Notify>,
    config: PoolConfig,
) -> JoinHandle<()> {
    let period = (config.idle_timeout / 2).max(REAP_INTERVAL_FLOOR);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.notified() => break,
            }
            let Some(state) = state.upgrade() else {
                break;
            };
            let expired = {
                let mut state = state.lock();
                if state.closed {
                    break;
                }
                let floor = config.initial_capacity.saturating_sub(state.outstanding);
                let mut expired = Vec::new();
                // Oldest entries sit at the front of the free-list.
                while state.free.len() > floor {
                    let timed_out = state
                        .free
                        .front()
                        .is_some_and(|entry| entry.returned_at.elapsed() >= config.idle_timeout);
                    if !timed_out {
                        break;
                    }
                    if let Some(entry) = state.free.pop_front() {
                        expired.push(entry.resource);
                    }
                }
                expired
            };
            if !expired.is_empty() {
                let evicted = expired.len();
                for _ in 0..evicted {
                    StatsTracker::bump(&stats.evicted);
                }
                close_batch(manager.as_ref(), &stats, expired, "idle eviction").await;
                debug!(evicted, "evicted idle resources");
            }
        }
    })
}
