//! # respool
//!
//! Bounded, concurrency-safe pooling of expensive-to-create resources
//! (database connections and similar remote client handles), plus a named
//! registry for running several independently configured pools side by
//! side.
//!
//! ## Features
//!
//! - Bounded capacity with lazy creation and optional warm-up
//! - Health validation on acquire; broken resources replaced, never
//!   handed out
//! - Fail-fast acquisition: no hidden blocking when the pool is exhausted
//! - Background idle eviction down to a configured floor
//! - Named registry with conflict-safe registration and forced hot-swap
//!   (old pool drained before the new one is installed)
//! - Activity stats snapshots (`serde`-serializable behind the `serde`
//!   feature)
//!
//! ## Quick start
//!
//! Implement [`ResourceManager`] for your backend, then build a
//! [`BoundedPool`] around it:
//!
//! ```
//! use respool::{BoundedPool, Pool, PoolConfig, ResourceManager};
//! use async_trait::async_trait;
//! use std::convert::Infallible;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Backend {
//!     next_id: AtomicUsize,
//! }
//!
//! #[async_trait]
//! impl ResourceManager for Backend {
//!     type Resource = usize;
//!     type Error = Infallible;
//!
//!     async fn create(&self) -> Result<usize, Infallible> {
//!         Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
//!     }
//!
//!     async fn close(&self, _handle: usize) -> Result<(), Infallible> {
//!         Ok(())
//!     }
//!
//!     async fn validate(&self, _handle: &usize) -> Result<(), Infallible> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), respool::PoolError> {
//! let backend = Backend { next_id: AtomicUsize::new(0) };
//! let pool = BoundedPool::new(PoolConfig::default(), backend)?;
//!
//! let handle = pool.acquire().await?;
//! // ... talk to the backend ...
//! pool.release(handle).await?;
//!
//! pool.drain().await;
//! # Ok(())
//! # }
//! ```
//!
//! Every `acquire` must be paired with a [`release`](Pool::release) (or a
//! [`discard`](Pool::discard) for a handle known to be broken); the pool
//! does not track borrowed handles beyond counting them.

mod config;
mod errors;
mod manager;
mod pool;
mod registry;
mod stats;

pub use config::PoolConfig;
pub use errors::{BoxedBackendError, PoolError, PoolResult};
pub use manager::ResourceManager;
pub use pool::{BoundedPool, Pool};
pub use registry::Registry;
pub use stats::PoolStats;
