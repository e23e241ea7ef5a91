//! Pool configuration options

use std::time::Duration;

use crate::errors::{PoolError, PoolResult};

/// Capacity and timing configuration for a [`BoundedPool`].
///
/// Immutable once the pool is constructed. The create/close/validate
/// collaborators are supplied separately through [`ResourceManager`].
///
/// [`BoundedPool`]: crate::BoundedPool
/// [`ResourceManager`]: crate::ResourceManager
///
/// # Examples
///
/// ```
/// use respool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_initial_capacity(3)
///     .with_max_capacity(10)
///     .with_idle_timeout(Duration::from_secs(60));
///
/// assert_eq!(config.max_capacity, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of resources idle eviction preserves; also the target of
    /// [`BoundedPool::warm_up`](crate::BoundedPool::warm_up).
    pub initial_capacity: usize,

    /// Hard upper bound on resources the pool tracks, idle plus checked out.
    pub max_capacity: usize,

    /// An idle resource older than this is closed by the eviction task.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 5,
            max_capacity: 20,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the maximum capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use respool::PoolConfig;
    ///
    /// let config = PoolConfig::new().with_max_capacity(50);
    /// assert_eq!(config.max_capacity, 50);
    /// ```
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Set the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Check the capacity invariant: `0 < initial_capacity <= max_capacity`.
    pub fn validate(&self) -> PoolResult<()> {
        if self.initial_capacity == 0 {
            return Err(PoolError::Config(
                "initial_capacity must be greater than zero".into(),
            ));
        }
        if self.initial_capacity > self.max_capacity {
            return Err(PoolError::Config(format!(
                "initial_capacity ({}) exceeds max_capacity ({})",
                self.initial_capacity, self.max_capacity
            )));
        }
        Ok(())
    }
}
