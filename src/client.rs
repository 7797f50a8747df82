//! One-shot SQL execution against a pool.
//!
//! [`SqlClient`] is implemented for every [`ResourcePool`] whose resource is
//! a [`SqlConnection`]. Each method checks out a connection, runs a single
//! statement, and returns the connection before resolving.
//!
//! # Example
//!
//! ```rust
//! use poolscope::prelude::*;
//! use poolscope::testing::MockPool;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let pool = MockPool::<String>::new().update_returns(UpdateResult::new(1));
//!
//! let summary = pool
//!     .update_with_params("DELETE FROM users WHERE id = ?", vec![json!(7)])
//!     .await
//!     .unwrap();
//! assert_eq!(summary.updated(), 1);
//! assert_eq!(pool.release_count(), 1);
//! # });
//! ```

use std::future::Future;

use crate::connection::SqlConnection;
use crate::error::ScopeError;
use crate::operation::Operation;
use crate::pool::ResourcePool;
use crate::result::{ResultSet, UpdateResult};
use crate::scope::scoped;
use crate::statement::{Mutation, Params, Query};

/// Result of a one-shot call on a [`SqlClient`].
pub type ScopeResult<T, E> = Result<T, ScopeError<E>>;

/// One-shot SQL operations on a connection pool.
pub trait SqlClient: ResourcePool
where
    Self::Resource: SqlConnection,
{
    /// Check out a connection for manual use.
    ///
    /// The caller owns the connection and must
    /// [`release`](crate::PooledResource::release) it.
    fn get_connection(&self) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send {
        self.acquire()
    }

    /// Run a statement that returns rows.
    fn query(
        &self,
        sql: impl Into<String>,
    ) -> impl Future<Output = ScopeResult<ResultSet, Self::Error>> + Send {
        scoped(self, Query::new(sql)).run()
    }

    /// Run a statement that returns rows, with positional parameters.
    fn query_with_params(
        &self,
        sql: impl Into<String>,
        params: Params,
    ) -> impl Future<Output = ScopeResult<ResultSet, Self::Error>> + Send {
        scoped(self, Query::with_params(sql, params)).run()
    }

    /// Run an `INSERT`, `UPDATE` or `DELETE`.
    fn update(
        &self,
        sql: impl Into<String>,
    ) -> impl Future<Output = ScopeResult<UpdateResult, Self::Error>> + Send {
        scoped(self, Mutation::new(sql)).run()
    }

    /// Run an `INSERT`, `UPDATE` or `DELETE` with positional parameters.
    fn update_with_params(
        &self,
        sql: impl Into<String>,
        params: Params,
    ) -> impl Future<Output = ScopeResult<UpdateResult, Self::Error>> + Send {
        scoped(self, Mutation::with_params(sql, params)).run()
    }

    /// Run an arbitrary operation on a scoped connection.
    fn with_connection<Op>(
        &self,
        operation: Op,
    ) -> impl Future<Output = ScopeResult<Op::Output, Self::Error>> + Send
    where
        Op: Operation<Self::Resource>,
    {
        scoped(self, operation).run()
    }

    /// Close the pool, logging the outcome.
    fn shutdown(&self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move {
            let closed = self.close().await;
            match &closed {
                Ok(()) => tracing::info!("sql client closed"),
                Err(e) => tracing::warn!(error = ?e, "sql client close failed"),
            }
            closed
        }
    }
}

impl<P> SqlClient for P
where
    P: ResourcePool + ?Sized,
    P::Resource: SqlConnection,
{
}
