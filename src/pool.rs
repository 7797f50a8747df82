//! Pool capabilities consumed by the scoped executor.
//!
//! The crate never builds a pool. It only needs something that can hand out
//! a resource and a resource that can be given back. Sizing, eviction, health
//! checks and timeouts all live behind these traits.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A resource checked out of a pool.
///
/// `release` takes the resource by value, so a handle can be returned at
/// most once. The executor guarantees it is returned at least once, even
/// when the run is dropped before it finishes.
pub trait PooledResource: Send {
    /// Error produced when returning the resource fails.
    type Error: Send;

    /// Return the resource to its pool.
    ///
    /// May fail, e.g. when the underlying transport is already broken.
    fn release(self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A pool of reusable resources.
///
/// Implementations must tolerate concurrent `acquire` calls; the executor
/// takes no locks of its own.
///
/// # Example
///
/// ```rust,ignore
/// impl ResourcePool for PgPool {
///     type Resource = PgConnection;
///     type Error = PgError;
///
///     async fn acquire(&self) -> Result<PgConnection, PgError> {
///         self.checkout().await
///     }
/// }
/// ```
pub trait ResourcePool: Send + Sync {
    /// The resource handed out by [`acquire`](Self::acquire).
    ///
    /// An abandoned run may move the resource into a background task to
    /// release it, hence `'static`.
    type Resource: PooledResource<Error = Self::Error> + 'static;

    /// Error shared by acquisition, execution and release.
    type Error: Send + fmt::Debug + 'static;

    /// Check a resource out of the pool.
    fn acquire(&self) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send;

    /// Close the pool and release everything it holds.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async { Ok(()) }
    }
}

impl<P> ResourcePool for Arc<P>
where
    P: ResourcePool,
{
    type Resource = P::Resource;
    type Error = P::Error;

    fn acquire(&self) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send {
        (**self).acquire()
    }

    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).close()
    }
}
