//! Payloads produced by SQL operations.

use serde_json::{Map, Value};

/// Rows returned by a query.
///
/// Rows are positional: `rows()[i][j]` is the value of column `columns()[j]`
/// in row `i`. Statements that produce several result sets chain them
/// through [`next_set`](Self::next_set).
///
/// # Example
///
/// ```rust
/// use poolscope::ResultSet;
/// use serde_json::json;
///
/// let rs = ResultSet::new(
///     vec!["id".into(), "name".into()],
///     vec![vec![json!(1), json!("ada")], vec![json!(2), json!("grace")]],
/// );
/// assert_eq!(rs.num_rows(), 2);
/// assert_eq!(rs.rows_as_objects()[1]["name"], json!("grace"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    next: Option<Box<ResultSet>>,
}

impl ResultSet {
    /// Create a result set from column names and positional rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            next: None,
        }
    }

    /// Attach the result set that follows this one.
    pub fn with_next(mut self, next: ResultSet) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Consume the result set, returning its rows.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    /// The following result set, if the statement produced more than one.
    pub fn next_set(&self) -> Option<&ResultSet> {
        self.next.as_deref()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name.
    ///
    /// Values beyond the last column are dropped; missing trailing values are
    /// absent from the object.
    pub fn rows_as_objects(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Summary of a mutation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateResult {
    updated: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    keys: Vec<Value>,
}

impl UpdateResult {
    /// Create a summary with the number of affected rows.
    pub fn new(updated: u64) -> Self {
        Self {
            updated,
            keys: Vec::new(),
        }
    }

    /// Attach generated keys.
    pub fn with_keys(mut self, keys: Vec<Value>) -> Self {
        self.keys = keys;
        self
    }

    /// Number of rows affected.
    pub fn updated(&self) -> u64 {
        self.updated
    }

    /// Keys generated by the statement, if any.
    pub fn keys(&self) -> &[Value] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> ResultSet {
        ResultSet::new(
            vec!["id".to_string(), "email".to_string()],
            vec![
                vec![json!(1), json!("a@example.com")],
                vec![json!(2), json!("b@example.com")],
                vec![json!(3), Value::Null],
            ],
        )
    }

    #[test]
    fn counts_rows_and_columns() {
        let rs = users();
        assert_eq!(rs.num_rows(), 3);
        assert_eq!(rs.num_columns(), 2);
        assert!(!rs.is_empty());
        assert!(ResultSet::default().is_empty());
    }

    #[test]
    fn into_rows_yields_rows_in_order() {
        let rows = users().into_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec![json!(2), json!("b@example.com")]);
    }

    #[test]
    fn rows_as_objects_keys_by_column() {
        let objects = users().rows_as_objects();
        assert_eq!(objects.len(), 3);
        assert_eq!(objects[0]["email"], json!("a@example.com"));
        assert_eq!(objects[2]["email"], Value::Null);
    }

    #[test]
    fn rows_as_objects_tolerates_ragged_rows() {
        let rs = ResultSet::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![json!(1)], vec![json!(1), json!(2), json!(3)]],
        );
        let objects = rs.rows_as_objects();
        assert_eq!(objects[0].len(), 1);
        assert_eq!(objects[1].len(), 2);
    }

    #[test]
    fn next_chains_result_sets() {
        let totals = ResultSet::new(vec!["total".to_string()], vec![vec![json!(3)]]);
        let rs = users().with_next(totals);
        let next = rs.next_set().map(ResultSet::num_rows);
        assert_eq!(next, Some(1));
        assert!(users().next_set().is_none());
    }

    #[test]
    fn update_result_keys() {
        let result = UpdateResult::new(2).with_keys(vec![json!(10), json!(11)]);
        assert_eq!(result.updated(), 2);
        assert_eq!(result.keys(), &[json!(10), json!(11)]);
        assert!(UpdateResult::new(0).keys().is_empty());
    }
}
