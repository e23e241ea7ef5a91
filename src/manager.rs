//! The collaborator seam between a pool and its backend

use async_trait::async_trait;

/// Backend adapter supplying the create/close/validate operations for one
/// resource type.
///
/// A pool never fabricates or inspects resources on its own; everything
/// backend-specific flows through an implementation of this trait, fixed at
/// pool construction. The resource type is fixed with it, so callers get a
/// concrete handle back from `acquire` with no downcasting.
///
/// All three operations may perform slow I/O; the pool invokes them outside
/// its internal lock.
#[async_trait]
pub trait ResourceManager: Send + Sync + 'static {
    /// The handle this manager produces (a database client, a socket, ...).
    type Resource: Send + 'static;

    /// Backend-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a fresh resource. A failure surfaces to the `acquire` caller
    /// as [`PoolError::BackendUnavailable`](crate::PoolError::BackendUnavailable).
    async fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Release the resource's underlying system state. Best-effort: failures
    /// during eviction or drain are logged, not propagated.
    async fn close(&self, resource: Self::Resource) -> Result<(), Self::Error>;

    /// Check that an idle resource is still usable. Run on every entry
    /// popped from the free-list before it is handed out; a failing resource
    /// is closed and replaced, never returned to a caller.
    async fn validate(&self, resource: &Self::Resource) -> Result<(), Self::Error>;
}
