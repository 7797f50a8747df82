//! Scoped execution: acquire, run, always release.
//!
//! This module provides:
//!
//! - [`scoped`] - Build a [`Scoped`] run of one operation against a pool
//! - [`Scoped::run`] - Execute it, releasing the resource on every exit path
//! - [`compose`] - The pure rule combining operation and release outcomes
//! - [`spawn_scoped`] - Detached variant that runs to completion (`async` feature)
//!
//! # Precedence
//!
//! | operation | release | result |
//! |-----------|---------|--------|
//! | `Ok(v)`   | `Ok`    | `Ok(v)` |
//! | `Err(e)`  | `Ok`    | `Err(Operation(e))` |
//! | any       | `Err(r)`| `Err(Release(r))` |
//!
//! A failed acquire short-circuits to `Err(Acquire(e))` without running the
//! operation or releasing anything.
//!
//! # Abandoned runs
//!
//! Once acquired, a resource is held by a guard until release. If the run
//! future is dropped first, the guard spawns the release on the current
//! Tokio runtime, so the resource is still returned exactly once.
//!
//! # Example
//!
//! ```rust
//! use poolscope::prelude::*;
//! use poolscope::testing::MockPool;
//!
//! # tokio_test::block_on(async {
//! let pool = MockPool::<String>::new().query_returns(ResultSet::default());
//!
//! let rows = scoped(&pool, Query::new("SELECT 1")).run().await;
//! assert!(rows.is_ok());
//! assert_eq!(pool.release_count(), 1);
//! # });
//! ```

use std::fmt;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::Instrument;

use crate::error::ScopeError;
use crate::operation::Operation;
use crate::pool::{PooledResource, ResourcePool};

/// One operation bound to the pool it will run against.
///
/// Created by [`scoped`]. Nothing happens until [`run`](Self::run) is awaited.
pub struct Scoped<'p, P: ?Sized, Op> {
    pool: &'p P,
    operation: Op,
}

impl<P: ?Sized, Op> fmt::Debug for Scoped<'_, P, Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped")
            .field("pool", &"<pool>")
            .field("operation", &"<operation>")
            .finish()
    }
}

impl<'p, P, Op> Scoped<'p, P, Op>
where
    P: ResourcePool + ?Sized,
    Op: Operation<P::Resource>,
{
    /// Create a new Scoped.
    pub fn new(pool: &'p P, operation: Op) -> Self {
        Scoped { pool, operation }
    }

    /// Acquire a resource, run the operation, release, and compose.
    ///
    /// The resource is released exactly once after a successful acquire,
    /// including when the operation panics; the panic is resumed after the
    /// release completes.
    ///
    /// Dropping this future after acquire stops the operation, and the
    /// resource is released on the current Tokio runtime in the background.
    /// With no runtime available the resource is dropped unreleased and a
    /// warning is logged.
    pub async fn run(self) -> Result<Op::Output, ScopeError<P::Error>> {
        let span = tracing::debug_span!("scoped", operation = self.operation.label());
        execute(self.pool, self.operation).instrument(span).await
    }
}

async fn execute<P, Op>(pool: &P, operation: Op) -> Result<Op::Output, ScopeError<P::Error>>
where
    P: ResourcePool + ?Sized,
    Op: Operation<P::Resource>,
{
    tracing::trace!("acquiring resource");
    let mut guard = match pool.acquire().await {
        Ok(resource) => ReleaseGuard::new(resource),
        Err(e) => {
            tracing::debug!(error = ?e, "acquire failed");
            return Err(ScopeError::Acquire(e));
        }
    };

    // The call to `execute` sits inside the async block so a panic raised
    // before the first poll is caught too.
    let outcome = AssertUnwindSafe(async { operation.execute(guard.get_mut()).await })
        .catch_unwind()
        .await;

    tracing::trace!("releasing resource");
    let released = guard.release().await;

    match outcome {
        Ok(result) => compose(result, released),
        Err(panic) => {
            if let Err(ref e) = released {
                tracing::error!(error = ?e, "release failed after operation panicked");
            }
            std::panic::resume_unwind(panic)
        }
    }
}

/// Owns an acquired resource until [`release`](Self::release) is reached.
///
/// Dropped while still holding the resource (the run future was abandoned
/// mid-operation), it releases the resource on the current Tokio runtime.
struct ReleaseGuard<R>
where
    R: PooledResource + 'static,
    R::Error: fmt::Debug,
{
    resource: Option<R>,
}

impl<R> ReleaseGuard<R>
where
    R: PooledResource + 'static,
    R::Error: fmt::Debug,
{
    fn new(resource: R) -> Self {
        ReleaseGuard {
            resource: Some(resource),
        }
    }

    fn get_mut(&mut self) -> &mut R {
        match self.resource.as_mut() {
            Some(resource) => resource,
            None => unreachable!("resource is only taken by release"),
        }
    }

    async fn release(mut self) -> Result<(), R::Error> {
        match self.resource.take() {
            Some(resource) => resource.release().await,
            None => Ok(()),
        }
    }
}

impl<R> Drop for ReleaseGuard<R>
where
    R: PooledResource + 'static,
    R::Error: fmt::Debug,
{
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            release_abandoned(resource);
        }
    }
}

#[cfg(feature = "async")]
fn release_abandoned<R>(resource: R)
where
    R: PooledResource + 'static,
    R::Error: fmt::Debug,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            tracing::debug!("run abandoned; releasing resource in background");
            handle.spawn(async move {
                if let Err(e) = resource.release().await {
                    tracing::warn!(error = ?e, "background release failed");
                }
            });
        }
        Err(_) => {
            tracing::warn!("run abandoned outside a Tokio runtime; resource dropped unreleased");
            drop(resource);
        }
    }
}

#[cfg(not(feature = "async"))]
fn release_abandoned<R>(resource: R)
where
    R: PooledResource + 'static,
    R::Error: fmt::Debug,
{
    tracing::warn!("run abandoned without the async feature; resource dropped unreleased");
    drop(resource);
}

/// Run `operation` against a resource from `pool`.
///
/// # Example
///
/// ```rust,ignore
/// let summary = scoped(&pool, Mutation::with_params(
///     "UPDATE users SET active = ? WHERE id = ?",
///     vec![json!(false), json!(42)],
/// ))
/// .run()
/// .await?;
/// ```
pub fn scoped<P, Op>(pool: &P, operation: Op) -> Scoped<'_, P, Op>
where
    P: ResourcePool + ?Sized,
    Op: Operation<P::Resource>,
{
    Scoped::new(pool, operation)
}

/// Combine the operation outcome with the release outcome.
///
/// A release failure wins over everything, including a successful operation.
/// The discarded outcome is logged at `warn`.
pub fn compose<T, E>(operation: Result<T, E>, release: Result<(), E>) -> Result<T, ScopeError<E>>
where
    E: fmt::Debug,
{
    match (operation, release) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(op_err), Ok(())) => Err(ScopeError::Operation(op_err)),
        (Ok(_), Err(rel_err)) => {
            tracing::warn!(
                error = ?rel_err,
                "release failed; discarding successful operation result"
            );
            Err(ScopeError::Release(rel_err))
        }
        (Err(op_err), Err(rel_err)) => {
            tracing::warn!(
                error = ?rel_err,
                discarded = ?op_err,
                "release failed; discarding operation error"
            );
            Err(ScopeError::Release(rel_err))
        }
    }
}

/// Run `operation` on a spawned task.
///
/// Dropping the returned handle does not cancel the task: the operation
/// itself runs to completion along with acquire and release.
///
/// Must be called from within a Tokio runtime.
#[cfg(feature = "async")]
pub fn spawn_scoped<P, Op>(
    pool: std::sync::Arc<P>,
    operation: Op,
) -> tokio::task::JoinHandle<Result<Op::Output, ScopeError<P::Error>>>
where
    P: ResourcePool + 'static,
    Op: Operation<P::Resource> + 'static,
    Op::Output: 'static,
{
    tokio::spawn(async move { scoped(&*pool, operation).run().await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqlConnection;
    use crate::operation::from_fn;
    use crate::statement::{Mutation, Query};
    use crate::testing::{MockConnection, MockPool};
    use futures::FutureExt;
    use tracing_test::traced_test;

    #[test]
    fn compose_success() {
        assert_eq!(compose::<_, &str>(Ok(3), Ok(())), Ok(3));
    }

    #[test]
    fn compose_operation_failure() {
        assert_eq!(
            compose::<i32, _>(Err("syntax"), Ok(())),
            Err(ScopeError::Operation("syntax"))
        );
    }

    #[test]
    fn compose_release_failure_discards_value() {
        assert_eq!(
            compose(Ok(3), Err("reset")),
            Err(ScopeError::Release("reset"))
        );
    }

    #[test]
    fn compose_release_failure_discards_operation_error() {
        assert_eq!(
            compose::<i32, _>(Err("syntax"), Err("reset")),
            Err(ScopeError::Release("reset"))
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn discarded_success_is_logged() {
        let pool = MockPool::new().fail_release("reset".to_string());

        let result = scoped(&pool, Query::new("SELECT 1")).run().await;

        assert_eq!(result, Err(ScopeError::Release("reset".to_string())));
        assert!(logs_contain("discarding successful operation result"));
    }

    #[tokio::test]
    #[traced_test]
    async fn discarded_operation_error_is_logged() {
        let pool = MockPool::new()
            .fail_updates("constraint".to_string())
            .fail_release("reset".to_string());

        let result = scoped(&pool, Mutation::new("DELETE FROM t")).run().await;

        assert_eq!(result, Err(ScopeError::Release("reset".to_string())));
        assert!(logs_contain("discarding operation error"));
        assert!(logs_contain("constraint"));
    }

    #[tokio::test]
    #[traced_test]
    async fn acquire_failure_is_logged_without_release() {
        let pool = MockPool::<String>::new().fail_acquire("timeout".to_string());

        let result = scoped(&pool, Query::new("SELECT 1")).run().await;

        assert_eq!(result, Err(ScopeError::Acquire("timeout".to_string())));
        assert!(logs_contain("acquire failed"));
        assert!(!logs_contain("releasing resource"));
        assert_eq!(pool.release_count(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn run_is_instrumented_with_operation_label() {
        let pool = MockPool::<String>::new();

        let result = scoped(
            &pool,
            Query::with_params("SELECT ?", vec![serde_json::json!(1)]),
        )
        .run()
        .await;

        assert!(result.is_ok());
        assert!(logs_contain("query_with_params"));
    }

    #[tokio::test]
    #[traced_test]
    async fn custom_label_names_the_span() {
        let pool = MockPool::<String>::new();
        let op = from_fn(|conn: &mut MockConnection<String>| {
            Box::pin(async move { conn.update("DELETE FROM sessions").await })
        })
        .labelled("purge_sessions");

        let result = scoped(&pool, op).run().await;

        assert!(result.is_ok());
        assert!(logs_contain("purge_sessions"));
    }

    #[cfg(feature = "async")]
    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn abandoned_run_releases_in_background() {
        let pool = MockPool::<String>::new();
        let run = scoped(
            &pool,
            from_fn(|conn: &mut MockConnection<String>| {
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    conn.query("SELECT 1").await
                })
            }),
        )
        .run();

        assert!(run.now_or_never().is_none());
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;

        assert_eq!(pool.statement_count(), 0);
        assert_eq!(pool.release_count(), 1);
        assert_eq!(pool.leak_count(), 0);
        assert_eq!(pool.in_use(), 0);
        assert!(logs_contain("releasing resource in background"));
    }

    #[test]
    #[traced_test]
    fn abandoned_run_outside_runtime_drops_resource() {
        let pool = MockPool::<String>::new();
        let run = scoped(
            &pool,
            from_fn(|conn: &mut MockConnection<String>| {
                Box::pin(async move {
                    futures::future::pending::<()>().await;
                    conn.query("SELECT 1").await
                })
            }),
        )
        .run();

        assert!(run.now_or_never().is_none());

        assert_eq!(pool.release_count(), 0);
        assert_eq!(pool.leak_count(), 1);
        assert!(logs_contain("resource dropped unreleased"));
    }
}
