//! The unit of work run against a checked-out resource.
//!
//! [`Operation`] is the seam the executor is generic over. The SQL shapes in
//! [`statement`](crate::statement) implement it, and [`from_fn`] lifts any
//! closure over `&mut Resource` into one.

use std::future::Future;
use std::pin::Pin;

use crate::pool::PooledResource;

/// A boxed future that is Send
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Work to run with exclusive access to one resource.
///
/// The resource is borrowed, never owned: the executor keeps ownership so it
/// can release the resource after `execute` completes, whatever the outcome.
pub trait Operation<R>: Send
where
    R: PooledResource,
{
    /// The payload produced on success.
    type Output: Send;

    /// Short name used in log spans.
    fn label(&self) -> &'static str {
        "operation"
    }

    /// Run the work against `resource`.
    fn execute(self, resource: &mut R)
        -> impl Future<Output = Result<Self::Output, R::Error>> + Send;
}

/// Operation built from a closure.
///
/// Created by [`from_fn`].
pub struct FromFn<F> {
    f: F,
    label: &'static str,
}

impl<F> std::fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromFn")
            .field("f", &"<function>")
            .field("label", &self.label)
            .finish()
    }
}

impl<F> FromFn<F> {
    /// Replace the span label (defaults to `"fn"`).
    pub fn labelled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

impl<R, F, T> Operation<R> for FromFn<F>
where
    R: PooledResource,
    F: for<'r> FnOnce(&'r mut R) -> BoxFuture<'r, Result<T, R::Error>> + Send,
    T: Send,
{
    type Output = T;

    fn label(&self) -> &'static str {
        self.label
    }

    fn execute(self, resource: &mut R) -> impl Future<Output = Result<T, R::Error>> + Send {
        (self.f)(resource)
    }
}

/// Lift a closure over the resource into an [`Operation`].
///
/// The closure returns a boxed future so that it may borrow the resource
/// across awaits.
///
/// # Example
///
/// ```rust,ignore
/// use poolscope::prelude::*;
///
/// let op = from_fn(|conn: &mut PgConnection| {
///     Box::pin(async move {
///         conn.update("DELETE FROM sessions WHERE expired").await?;
///         conn.query("SELECT count(*) FROM sessions").await
///     })
/// });
/// let remaining = pool.with_connection(op).await?;
/// ```
pub fn from_fn<R, F, T>(f: F) -> FromFn<F>
where
    R: PooledResource,
    F: for<'r> FnOnce(&'r mut R) -> BoxFuture<'r, Result<T, R::Error>> + Send,
    T: Send,
{
    FromFn { f, label: "fn" }
}
