//! Named-pool directory with conflict-safe registration and hot-swap

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::PoolConfig;
use crate::errors::{PoolError, PoolResult};
use crate::manager::ResourceManager;
use crate::pool::{BoundedPool, Pool};

/// Directory mapping a name to one live pool instance.
///
/// Lets independently configured pools (one per backend alias) coexist, with
/// thread-safe lookup and hot-swap as first-class operations. A registry is
/// an explicit value the application constructs and injects into consumers;
/// [`drain_all`](Registry::drain_all) is its teardown point.
///
/// A caller holding an `Arc` it looked up earlier keeps using that pool
/// through a forced swap; once it releases or discards its resource, the
/// drained pool refuses to re-pool anything.
pub struct Registry<P: Pool> {
    pools: RwLock<HashMap<String, Arc<P>>>,
}

impl<P: Pool> Registry<P> {
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Install a pool under `name`.
    ///
    /// Without `force`, an occupied name fails with
    /// [`PoolError::RegistrationConflict`] and nothing changes; the caller
    /// keeps its handle, the incumbent keeps serving. With `force`, the
    /// incumbent is drained before the new pool is installed, while the
    /// registry's write access is held, so concurrent lookups never observe
    /// a half-swapped state and the old pool's idle resources cannot leak.
    pub async fn register(
        &self,
        name: impl Into<String>,
        pool: Arc<P>,
        force: bool,
    ) -> PoolResult<()> {
        let name = name.into();
        let mut pools = self.pools.write().await;
        match pools.entry(name) {
            Entry::Occupied(mut occupied) => {
                if !force {
                    return Err(PoolError::RegistrationConflict(occupied.key().clone()));
                }
                occupied.get().drain().await;
                debug!(name = %occupied.key(), "drained incumbent and replaced registered pool");
                occupied.insert(pool);
            }
            Entry::Vacant(vacant) => {
                debug!(name = %vacant.key(), "registered pool");
                vacant.insert(pool);
            }
        }
        Ok(())
    }

    /// Look up the pool registered under `name`, if any.
    pub async fn lookup(&self, name: &str) -> Option<Arc<P>> {
        self.pools.read().await.get(name).cloned()
    }

    /// Remove and drain every registered pool. Outstanding resources are
    /// still closed lazily as their holders return them.
    pub async fn drain_all(&self) {
        let pools: Vec<Arc<P>> = self.pools.write().await.drain().map(|(_, p)| p).collect();
        for pool in pools {
            pool.drain().await;
        }
    }
}

impl<P: Pool> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ResourceManager> Registry<BoundedPool<M>> {
    /// Build a [`BoundedPool`] from `config` and `manager` and register it
    /// in one step, handing back the installed pool.
    ///
    /// On a registration conflict the incumbent stays installed and the
    /// freshly built pool is dropped; it was never adopted and held no
    /// resources yet.
    pub async fn register_with(
        &self,
        name: impl Into<String>,
        config: PoolConfig,
        manager: M,
        force: bool,
    ) -> PoolResult<Arc<BoundedPool<M>>> {
        let pool = Arc::new(BoundedPool::new(config, manager)?);
        self.register(name, Arc::clone(&pool), force).await?;
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Unit-resource backend that only counts closes.
    #[derive(Default)]
    struct NullBackend {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ResourceManager for NullBackend {
        type Resource = ();
        type Error = Infallible;

        async fn create(&self) -> Result<(), Infallible> {
            Ok(())
        }

        async fn close(&self, _resource: ()) -> Result<(), Infallible> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn validate(&self, _resource: &()) -> Result<(), Infallible> {
            Ok(())
        }
    }

    /// Backend whose closer always errors after counting the attempt.
    struct FlakyBackend {
        close_attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ResourceManager for FlakyBackend {
        type Resource = ();
        type Error = std::io::Error;

        async fn create(&self) -> Result<(), std::io::Error> {
            Ok(())
        }

        async fn close(&self, _resource: ()) -> Result<(), std::io::Error> {
            self.close_attempts.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::other("disconnect refused"))
        }

        async fn validate(&self, _resource: &()) -> Result<(), std::io::Error> {
            Ok(())
        }
    }

    fn small_pool() -> (Arc<BoundedPool<NullBackend>>, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        let backend = NullBackend {
            closed: Arc::clone(&closed),
        };
        let config = PoolConfig::new()
            .with_initial_capacity(1)
            .with_max_capacity(4);
        (Arc::new(BoundedPool::new(config, backend).unwrap()), closed)
    }

    #[tokio::test]
    async fn lookup_missing_name_returns_none() {
        let registry: Registry<BoundedPool<NullBackend>> = Registry::new();
        assert!(registry.lookup("default").await.is_none());
    }

    #[tokio::test]
    async fn conflict_leaves_incumbent_installed() {
        let registry = Registry::new();
        let (p1, _) = small_pool();
        let (p2, _) = small_pool();

        registry.register("db", Arc::clone(&p1), false).await.unwrap();
        let err = registry
            .register("db", Arc::clone(&p2), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::RegistrationConflict(name) if name == "db"));

        let found = registry.lookup("db").await.unwrap();
        assert!(Arc::ptr_eq(&found, &p1));

        // The rejected pool was never adopted and still works.
        let conn = p2.acquire().await.unwrap();
        p2.release(conn).await.unwrap();
    }

    #[tokio::test]
    async fn force_swap_drains_incumbent_before_install() {
        let registry = Registry::new();
        let (p1, p1_closed) = small_pool();
        let (p2, _) = small_pool();

        // Put two idle resources into the incumbent.
        let a = p1.acquire().await.unwrap();
        let b = p1.acquire().await.unwrap();
        p1.release(a).await.unwrap();
        p1.release(b).await.unwrap();
        registry.register("db", Arc::clone(&p1), false).await.unwrap();

        registry.register("db", Arc::clone(&p2), true).await.unwrap();
        assert_eq!(p1_closed.load(Ordering::SeqCst), 2);
        assert!(matches!(p1.acquire().await, Err(PoolError::Closed)));

        let found = registry.lookup("db").await.unwrap();
        assert!(Arc::ptr_eq(&found, &p2));
    }

    #[tokio::test]
    async fn pre_swap_holder_settles_against_drained_pool() {
        let registry = Registry::new();
        let (p1, p1_closed) = small_pool();
        let (p2, _) = small_pool();
        registry.register("db", Arc::clone(&p1), false).await.unwrap();

        let held = p1.acquire().await.unwrap();
        registry.register("db", p2, true).await.unwrap();

        // The drained pool refuses to re-pool but still closes the handle.
        assert!(matches!(p1.release(held).await, Err(PoolError::Closed)));
        assert_eq!(p1_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_swap_completes_when_incumbent_closer_fails() {
        let registry = Registry::new();
        let close_attempts = Arc::new(AtomicUsize::new(0));
        let backend = FlakyBackend {
            close_attempts: Arc::clone(&close_attempts),
        };
        let config = PoolConfig::new()
            .with_initial_capacity(1)
            .with_max_capacity(4);
        let p1 = Arc::new(BoundedPool::new(config.clone(), backend).unwrap());
        let p2 = Arc::new(
            BoundedPool::new(
                config,
                FlakyBackend {
                    close_attempts: Arc::new(AtomicUsize::new(0)),
                },
            )
            .unwrap(),
        );

        let a = p1.acquire().await.unwrap();
        let b = p1.acquire().await.unwrap();
        p1.release(a).await.unwrap();
        p1.release(b).await.unwrap();
        registry.register("db", Arc::clone(&p1), false).await.unwrap();

        // The incumbent's closer errors on every entry; the swap still
        // tears down both and installs the replacement.
        registry.register("db", Arc::clone(&p2), true).await.unwrap();
        assert_eq!(close_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(p1.size(), 0);
        let found = registry.lookup("db").await.unwrap();
        assert!(Arc::ptr_eq(&found, &p2));
    }

    #[tokio::test]
    async fn register_with_builds_and_installs() {
        let registry = Registry::new();
        let config = PoolConfig::new()
            .with_initial_capacity(1)
            .with_max_capacity(2);
        let pool = registry
            .register_with("default", config, NullBackend::default(), false)
            .await
            .unwrap();

        let found = registry.lookup("default").await.unwrap();
        assert!(Arc::ptr_eq(&found, &pool));
    }

    #[tokio::test]
    async fn drain_all_empties_the_directory() {
        let registry = Registry::new();
        let (p1, p1_closed) = small_pool();
        let conn = p1.acquire().await.unwrap();
        p1.release(conn).await.unwrap();
        registry.register("db", Arc::clone(&p1), false).await.unwrap();

        registry.drain_all().await;
        assert!(registry.lookup("db").await.is_none());
        assert_eq!(p1_closed.load(Ordering::SeqCst), 1);
    }
}
