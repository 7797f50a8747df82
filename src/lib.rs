//! # Poolscope
//!
//! Scoped one-shot execution against pooled connections.
//!
//! Checking a connection out of a pool for a single statement is easy to get
//! subtly wrong: skip the release on an error path and the pool leaks; let
//! the statement's error hide a failed release and the pool silently shrinks.
//! Poolscope runs every operation as **acquire → execute → release →
//! compose**, with the release on a single unconditional path.
//!
//! ## Quick Example
//!
//! ```rust
//! use poolscope::prelude::*;
//! use poolscope::testing::MockPool;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let pool = MockPool::<String>::new().query_returns(ResultSet::new(
//!     vec!["id".into()],
//!     vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]],
//! ));
//!
//! let rows = pool.query("SELECT id FROM users").await.unwrap();
//! assert_eq!(rows.num_rows(), 3);
//!
//! // The connection is back in the pool before `query` resolves.
//! assert_eq!(pool.in_use(), 0);
//! # });
//! ```
//!
//! ## Failure precedence
//!
//! A failed acquire is reported as [`ScopeError::Acquire`] and nothing else
//! runs. Otherwise a failed release always wins ([`ScopeError::Release`]),
//! even over a successful operation; a clean release surfaces the
//! operation's own outcome. See [`scope`] for the full table.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod client;
pub mod connection;
pub mod error;
pub mod operation;
pub mod pool;
pub mod result;
pub mod scope;
pub mod statement;
pub mod testing;

// Re-exports
pub use client::{ScopeResult, SqlClient};
pub use connection::SqlConnection;
pub use error::{Phase, ScopeError};
pub use operation::{from_fn, BoxFuture, FromFn, Operation};
pub use pool::{PooledResource, ResourcePool};
pub use result::{ResultSet, UpdateResult};
#[cfg(feature = "async")]
pub use scope::spawn_scoped;
pub use scope::{compose, scoped, Scoped};
pub use statement::{Mutation, OperationKind, Params, Query, Statement};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::SqlClient;
    pub use crate::connection::SqlConnection;
    pub use crate::error::{Phase, ScopeError};
    pub use crate::operation::{from_fn, BoxFuture, Operation};
    pub use crate::pool::{PooledResource, ResourcePool};
    pub use crate::result::{ResultSet, UpdateResult};
    #[cfg(feature = "async")]
    pub use crate::scope::spawn_scoped;
    pub use crate::scope::{compose, scoped};
    pub use crate::statement::{Mutation, Params, Query, Statement};
}
