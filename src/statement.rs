//! SQL statements and the two operation kinds built from them.
//!
//! A [`Statement`] is text plus optional positional parameters. Wrapping it
//! in [`Query`] or [`Mutation`] selects the connection method and payload:
//!
//! | Operation | Connection method | Payload |
//! |-----------|-------------------|---------|
//! | `Query::new` | `query` | [`ResultSet`] |
//! | `Query::with_params` | `query_with_params` | [`ResultSet`] |
//! | `Mutation::new` | `update` | [`UpdateResult`] |
//! | `Mutation::with_params` | `update_with_params` | [`UpdateResult`] |

use serde_json::Value;

use crate::connection::SqlConnection;
use crate::operation::Operation;
use crate::result::{ResultSet, UpdateResult};

/// Positional statement parameters.
pub type Params = Vec<Value>;

/// The kind of SQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OperationKind {
    /// Returns rows.
    Query,
    /// Modifies rows and reports how many.
    Mutation,
}

/// SQL text with optional positional parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statement {
    sql: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    params: Option<Params>,
}

impl Statement {
    /// A statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: None,
        }
    }

    /// A statement with positional parameters.
    ///
    /// An empty `params` is still bound: the parameterized connection method
    /// is used.
    pub fn with_params(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params: Some(params),
        }
    }

    /// The statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters, if any.
    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }
}

/// A row-returning operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    statement: Statement,
}

impl Query {
    /// Query without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Statement::new(sql).into()
    }

    /// Query with positional parameters.
    pub fn with_params(sql: impl Into<String>, params: Params) -> Self {
        Statement::with_params(sql, params).into()
    }

    /// The wrapped statement.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Always [`OperationKind::Query`].
    pub fn kind(&self) -> OperationKind {
        OperationKind::Query
    }
}

impl From<Statement> for Query {
    fn from(statement: Statement) -> Self {
        Query { statement }
    }
}

impl<C> Operation<C> for Query
where
    C: SqlConnection,
{
    type Output = ResultSet;

    fn label(&self) -> &'static str {
        match self.statement.params {
            None => "query",
            Some(_) => "query_with_params",
        }
    }

    async fn execute(self, conn: &mut C) -> Result<ResultSet, C::Error> {
        let Statement { sql, params } = self.statement;
        match params {
            None => conn.query(&sql).await,
            Some(params) => conn.query_with_params(&sql, &params).await,
        }
    }
}

/// A row-modifying operation (`INSERT`, `UPDATE`, `DELETE`).
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    statement: Statement,
}

impl Mutation {
    /// Mutation without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Statement::new(sql).into()
    }

    /// Mutation with positional parameters.
    pub fn with_params(sql: impl Into<String>, params: Params) -> Self {
        Statement::with_params(sql, params).into()
    }

    /// The wrapped statement.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Always [`OperationKind::Mutation`].
    pub fn kind(&self) -> OperationKind {
        OperationKind::Mutation
    }
}

impl From<Statement> for Mutation {
    fn from(statement: Statement) -> Self {
        Mutation { statement }
    }
}

impl<C> Operation<C> for Mutation
where
    C: SqlConnection,
{
    type Output = UpdateResult;

    fn label(&self) -> &'static str {
        match self.statement.params {
            None => "update",
            Some(_) => "update_with_params",
        }
    }

    async fn execute(self, conn: &mut C) -> Result<UpdateResult, C::Error> {
        let Statement { sql, params } = self.statement;
        match params {
            None => conn.update(&sql).await,
            Some(params) => conn.update_with_params(&sql, &params).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statement_without_params() {
        let stmt = Statement::new("SELECT 1");
        assert_eq!(stmt.sql(), "SELECT 1");
        assert!(stmt.params().is_none());
    }

    #[test]
    fn empty_params_are_still_bound() {
        let stmt = Statement::with_params("SELECT 1", vec![]);
        assert_eq!(stmt.params(), Some(&vec![]));
    }

    #[test]
    fn kinds() {
        assert_eq!(Query::new("SELECT 1").kind(), OperationKind::Query);
        assert_eq!(
            Mutation::with_params("DELETE FROM t WHERE id = ?", vec![json!(1)]).kind(),
            OperationKind::Mutation
        );
    }

    #[test]
    fn query_keeps_statement() {
        let query = Query::with_params("SELECT * FROM t WHERE id = ?", vec![json!(7)]);
        assert_eq!(query.statement().sql(), "SELECT * FROM t WHERE id = ?");
        assert_eq!(query.statement().params(), Some(&vec![json!(7)]));
    }
}
