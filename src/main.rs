// respool - bounded resource pool with a named registry
//
// This is just a small demo binary; the actual library is in lib.rs.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use respool::{Pool, PoolConfig, Registry, ResourceManager};

/// Stand-in backend handing out numbered "connections".
struct DemoBackend {
    next_id: AtomicUsize,
}

#[async_trait]
impl ResourceManager for DemoBackend {
    type Resource = usize;
    type Error = Infallible;

    async fn create(&self) -> Result<usize, Infallible> {
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn close(&self, _handle: usize) -> Result<(), Infallible> {
        Ok(())
    }

    async fn validate(&self, _handle: &usize) -> Result<(), Infallible> {
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), respool::PoolError> {
    let registry = Registry::new();
    let config = PoolConfig::new()
        .with_initial_capacity(2)
        .with_max_capacity(5)
        .with_idle_timeout(Duration::from_secs(30));
    let backend = DemoBackend {
        next_id: AtomicUsize::new(0),
    };
    let pool = registry
        .register_with("default", config, backend, false)
        .await?;

    let handle = pool.acquire().await?;
    println!("acquired connection #{handle}");
    pool.release(handle).await?;

    let stats = pool.stats();
    println!(
        "idle {} / outstanding {} / created {}",
        stats.idle_resources, stats.outstanding_resources, stats.created,
    );

    registry.drain_all().await;
    Ok(())
}
