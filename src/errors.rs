//! Error types for the resource pool

use thiserror::Error;

/// Boxed collaborator error carried as the source of a pool error.
pub type BoxedBackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    /// The capacity configuration is invalid (see [`PoolConfig::validate`]).
    ///
    /// [`PoolConfig::validate`]: crate::PoolConfig::validate
    #[error("invalid pool configuration: {0}")]
    Config(String),

    /// The backend refused to produce (or tear down) a resource.
    /// The manager's own error is attached as the source.
    #[error("backend unavailable")]
    BackendUnavailable(#[source] BoxedBackendError),

    /// Every slot is checked out and the free-list is empty.
    /// Acquire never waits; callers wanting backpressure retry themselves.
    #[error("pool exhausted - all resources checked out")]
    Exhausted,

    /// The pool has been drained and accepts no further work.
    #[error("pool is closed")]
    Closed,

    /// The name is already registered and `force` was not requested.
    #[error("pool name {0:?} is already registered")]
    RegistrationConflict(String),
}

impl PoolError {
    pub(crate) fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PoolError::BackendUnavailable(Box::new(err))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_keeps_source() {
        let err = PoolError::backend(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(err, PoolError::BackendUnavailable(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn identities_are_matchable() {
        let err = PoolError::Exhausted;
        assert!(matches!(err, PoolError::Exhausted));
        assert_eq!(PoolError::Closed.to_string(), "pool is closed");
    }
}
