//! SQL capability of a pooled connection.

use std::future::Future;

use crate::pool::PooledResource;
use crate::result::{ResultSet, UpdateResult};
use crate::statement::Params;

/// A pooled connection able to run SQL statements.
///
/// Each method is independently failable. None of them releases the
/// connection; that is the executor's job.
pub trait SqlConnection: PooledResource {
    /// Run a statement that returns rows.
    fn query(&mut self, sql: &str)
        -> impl Future<Output = Result<ResultSet, Self::Error>> + Send;

    /// Run a statement that returns rows, binding positional parameters.
    fn query_with_params(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<ResultSet, Self::Error>> + Send;

    /// Run an `INSERT`, `UPDATE` or `DELETE`.
    fn update(&mut self, sql: &str)
        -> impl Future<Output = Result<UpdateResult, Self::Error>> + Send;

    /// Run an `INSERT`, `UPDATE` or `DELETE`, binding positional parameters.
    fn update_with_params(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<UpdateResult, Self::Error>> + Send;
}
