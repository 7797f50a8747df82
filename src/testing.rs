//! Testing utilities for code built on scoped execution.
//!
//! This module provides a scripted in-memory pool that records every
//! acquire, statement and release, plus assertion macros for the three
//! failure phases.
//!
//! # Examples
//!
//! ## MockPool
//!
//! ```rust
//! use poolscope::prelude::*;
//! use poolscope::testing::{MockEvent, MockPool};
//!
//! # tokio_test::block_on(async {
//! let pool = MockPool::new().fail_release("connection reset".to_string());
//!
//! let result = pool.query("SELECT 1").await;
//! poolscope::assert_release_failure!(result, "connection reset".to_string());
//!
//! assert_eq!(
//!     pool.events(),
//!     vec![
//!         MockEvent::Acquired(0),
//!         MockEvent::Query { conn: 0, sql: "SELECT 1".into(), params: None },
//!         MockEvent::Released(0),
//!     ]
//! );
//! # });
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::SqlConnection;
use crate::pool::{PooledResource, ResourcePool};
use crate::result::{ResultSet, UpdateResult};
use crate::statement::Params;

/// Something that happened to a [`MockPool`] or one of its connections.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    /// Connection `id` was handed out.
    Acquired(usize),
    /// An acquire was scripted to fail.
    AcquireFailed,
    /// A row-returning statement ran on connection `conn`.
    Query {
        /// Connection id.
        conn: usize,
        /// Statement text.
        sql: String,
        /// Bound parameters, if the parameterized method was used.
        params: Option<Params>,
    },
    /// A mutation ran on connection `conn`.
    Update {
        /// Connection id.
        conn: usize,
        /// Statement text.
        sql: String,
        /// Bound parameters, if the parameterized method was used.
        params: Option<Params>,
    },
    /// Connection `id` was released.
    Released(usize),
    /// Connection `id` was dropped without being released.
    Leaked(usize),
}

#[derive(Debug, Clone)]
struct Script<E> {
    acquire: Option<E>,
    query: Result<ResultSet, E>,
    update: Result<UpdateResult, E>,
    release: Option<E>,
    close: Option<E>,
}

#[derive(Debug, Default)]
struct Journal {
    events: Mutex<Vec<MockEvent>>,
    next_id: AtomicUsize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
    closed: AtomicBool,
}

impl Journal {
    fn record(&self, event: MockEvent) {
        self.events.lock().push(event);
    }

    fn check_out(&self) -> usize {
        let now = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(MockEvent::Acquired(id));
        id
    }

    fn check_in(&self, event: MockEvent) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        self.record(event);
    }

    fn count(&self, pred: impl Fn(&MockEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(*e)).count()
    }
}

/// A scripted, in-memory connection pool.
///
/// Every connection handed out follows the same script. By default acquire,
/// every statement and release succeed; queries return an empty
/// [`ResultSet`] and mutations report zero affected rows.
pub struct MockPool<E> {
    script: Arc<Script<E>>,
    journal: Arc<Journal>,
}

impl<E: fmt::Debug> fmt::Debug for MockPool<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPool")
            .field("script", &self.script)
            .field("in_use", &self.journal.in_use.load(Ordering::SeqCst))
            .finish()
    }
}

impl<E> Default for MockPool<E>
where
    E: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> MockPool<E>
where
    E: Clone + Send + Sync + fmt::Debug + 'static,
{
    /// Create a pool where everything succeeds.
    pub fn new() -> Self {
        MockPool {
            script: Arc::new(Script {
                acquire: None,
                query: Ok(ResultSet::default()),
                update: Ok(UpdateResult::default()),
                release: None,
                close: None,
            }),
            journal: Arc::new(Journal::default()),
        }
    }

    fn script_mut(&mut self) -> &mut Script<E> {
        Arc::make_mut(&mut self.script)
    }

    /// Make every acquire fail with `error`.
    pub fn fail_acquire(mut self, error: E) -> Self {
        self.script_mut().acquire = Some(error);
        self
    }

    /// Return `rows` from every query.
    pub fn query_returns(mut self, rows: ResultSet) -> Self {
        self.script_mut().query = Ok(rows);
        self
    }

    /// Make every query fail with `error`.
    pub fn fail_queries(mut self, error: E) -> Self {
        self.script_mut().query = Err(error);
        self
    }

    /// Return `summary` from every mutation.
    pub fn update_returns(mut self, summary: UpdateResult) -> Self {
        self.script_mut().update = Ok(summary);
        self
    }

    /// Make every mutation fail with `error`.
    pub fn fail_updates(mut self, error: E) -> Self {
        self.script_mut().update = Err(error);
        self
    }

    /// Make every release fail with `error`.
    ///
    /// The connection still counts as returned.
    pub fn fail_release(mut self, error: E) -> Self {
        self.script_mut().release = Some(error);
        self
    }

    /// Make [`close`](ResourcePool::close) fail with `error`.
    pub fn fail_close(mut self, error: E) -> Self {
        self.script_mut().close = Some(error);
        self
    }

    /// Everything recorded so far, in order.
    pub fn events(&self) -> Vec<MockEvent> {
        self.journal.events.lock().clone()
    }

    /// Number of connections handed out.
    pub fn acquire_count(&self) -> usize {
        self.journal.count(|e| matches!(e, MockEvent::Acquired(_)))
    }

    /// Number of releases, successful or not.
    pub fn release_count(&self) -> usize {
        self.journal.count(|e| matches!(e, MockEvent::Released(_)))
    }

    /// Number of releases of connection `id`.
    pub fn releases_of(&self, id: usize) -> usize {
        self.journal.count(|e| matches!(e, MockEvent::Released(n) if *n == id))
    }

    /// Number of connections dropped without release.
    pub fn leak_count(&self) -> usize {
        self.journal.count(|e| matches!(e, MockEvent::Leaked(_)))
    }

    /// Number of statements executed, queries and mutations alike.
    pub fn statement_count(&self) -> usize {
        self.journal
            .count(|e| matches!(e, MockEvent::Query { .. } | MockEvent::Update { .. }))
    }

    /// Connections currently checked out.
    pub fn in_use(&self) -> usize {
        self.journal.in_use.load(Ordering::SeqCst)
    }

    /// Highest number of connections checked out at once.
    pub fn peak_in_use(&self) -> usize {
        self.journal.peak.load(Ordering::SeqCst)
    }

    /// Returns `true` once [`close`](ResourcePool::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.journal.closed.load(Ordering::SeqCst)
    }
}

impl<E> ResourcePool for MockPool<E>
where
    E: Clone + Send + Sync + fmt::Debug + 'static,
{
    type Resource = MockConnection<E>;
    type Error = E;

    async fn acquire(&self) -> Result<MockConnection<E>, E> {
        if let Some(error) = &self.script.acquire {
            self.journal.record(MockEvent::AcquireFailed);
            return Err(error.clone());
        }
        Ok(MockConnection {
            id: self.journal.check_out(),
            script: Arc::clone(&self.script),
            journal: Arc::clone(&self.journal),
            released: false,
        })
    }

    async fn close(&self) -> Result<(), E> {
        self.journal.closed.store(true, Ordering::SeqCst);
        match &self.script.close {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// A connection handed out by [`MockPool`].
///
/// Dropping it without calling `release` records [`MockEvent::Leaked`].
pub struct MockConnection<E> {
    id: usize,
    script: Arc<Script<E>>,
    journal: Arc<Journal>,
    released: bool,
}

impl<E> fmt::Debug for MockConnection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnection")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

impl<E> MockConnection<E> {
    /// Identifier assigned at acquire, in acquisition order from zero.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl<E> Drop for MockConnection<E> {
    fn drop(&mut self) {
        if !self.released {
            self.journal.check_in(MockEvent::Leaked(self.id));
        }
    }
}

impl<E> PooledResource for MockConnection<E>
where
    E: Clone + Send + Sync + fmt::Debug + 'static,
{
    type Error = E;

    async fn release(mut self) -> Result<(), E> {
        self.released = true;
        self.journal.check_in(MockEvent::Released(self.id));
        match &self.script.release {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl<E> SqlConnection for MockConnection<E>
where
    E: Clone + Send + Sync + fmt::Debug + 'static,
{
    async fn query(&mut self, sql: &str) -> Result<ResultSet, E> {
        self.journal.record(MockEvent::Query {
            conn: self.id,
            sql: sql.to_string(),
            params: None,
        });
        self.script.query.clone()
    }

    async fn query_with_params(&mut self, sql: &str, params: &Params) -> Result<ResultSet, E> {
        self.journal.record(MockEvent::Query {
            conn: self.id,
            sql: sql.to_string(),
            params: Some(params.clone()),
        });
        self.script.query.clone()
    }

    async fn update(&mut self, sql: &str) -> Result<UpdateResult, E> {
        self.journal.record(MockEvent::Update {
            conn: self.id,
            sql: sql.to_string(),
            params: None,
        });
        self.script.update.clone()
    }

    async fn update_with_params(&mut self, sql: &str, params: &Params) -> Result<UpdateResult, E> {
        self.journal.record(MockEvent::Update {
            conn: self.id,
            sql: sql.to_string(),
            params: Some(params.clone()),
        });
        self.script.update.clone()
    }
}

/// Assert that a scoped run failed while acquiring.
///
/// # Example
///
/// ```rust
/// use poolscope::{assert_acquire_failure, ScopeError};
///
/// let result: Result<(), _> = Err(ScopeError::Acquire("timeout"));
/// assert_acquire_failure!(result, "timeout");
/// ```
#[macro_export]
macro_rules! assert_acquire_failure {
    ($result:expr) => {
        match $result {
            Err($crate::ScopeError::Acquire(_)) => {}
            other => panic!("Expected acquire failure, got {:?}", other),
        }
    };
    ($result:expr, $cause:expr) => {
        match $result {
            Err($crate::ScopeError::Acquire(e)) => assert_eq!(e, $cause),
            other => panic!("Expected acquire failure, got {:?}", other),
        }
    };
}

/// Assert that a scoped run failed in the operation, with a clean release.
///
/// # Example
///
/// ```rust
/// use poolscope::{assert_operation_failure, ScopeError};
///
/// let result: Result<(), _> = Err(ScopeError::Operation("syntax error"));
/// assert_operation_failure!(result, "syntax error");
/// ```
#[macro_export]
macro_rules! assert_operation_failure {
    ($result:expr) => {
        match $result {
            Err($crate::ScopeError::Operation(_)) => {}
            other => panic!("Expected operation failure, got {:?}", other),
        }
    };
    ($result:expr, $cause:expr) => {
        match $result {
            Err($crate::ScopeError::Operation(e)) => assert_eq!(e, $cause),
            other => panic!("Expected operation failure, got {:?}", other),
        }
    };
}

/// Assert that a scoped run failed while releasing.
///
/// # Example
///
/// ```rust
/// use poolscope::{assert_release_failure, ScopeError};
///
/// let result: Result<(), _> = Err(ScopeError::Release("connection reset"));
/// assert_release_failure!(result, "connection reset");
/// ```
#[macro_export]
macro_rules! assert_release_failure {
    ($result:expr) => {
        match $result {
            Err($crate::ScopeError::Release(_)) => {}
            other => panic!("Expected release failure, got {:?}", other),
        }
    };
    ($result:expr, $cause:expr) => {
        match $result {
            Err($crate::ScopeError::Release(e)) => assert_eq!(e, $cause),
            other => panic!("Expected release failure, got {:?}", other),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScopeError;

    #[tokio::test]
    async fn connection_ids_are_sequential() {
        let pool = MockPool::<String>::new();
        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_eq!((a.id(), b.id()), (0, 1));
        assert_eq!(pool.in_use(), 2);

        a.release().await.unwrap();
        b.release().await.unwrap();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.peak_in_use(), 2);
    }

    #[tokio::test]
    async fn dropped_connection_is_recorded_as_leak() {
        let pool = MockPool::<String>::new();
        let conn = pool.acquire().await.unwrap();
        drop(conn);
        assert_eq!(pool.leak_count(), 1);
        assert_eq!(pool.release_count(), 0);
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn failed_release_still_returns_connection() {
        let pool = MockPool::new().fail_release("reset".to_string());
        let conn = pool.acquire().await.unwrap();
        assert_eq!(conn.release().await, Err("reset".to_string()));
        assert_eq!(pool.releases_of(0), 1);
        assert_eq!(pool.leak_count(), 0);
    }

    #[tokio::test]
    async fn close_sets_flag() {
        let pool = MockPool::new().fail_close("busy".to_string());
        assert!(!pool.is_closed());
        assert_eq!(pool.close().await, Err("busy".to_string()));
        assert!(pool.is_closed());
    }

    #[test]
    fn assert_macros_accept_matching_phase() {
        let acquire: Result<(), _> = Err(ScopeError::Acquire(1));
        assert_acquire_failure!(acquire, 1);
        let operation: Result<(), _> = Err(ScopeError::Operation(2));
        assert_operation_failure!(operation);
        let release: Result<(), _> = Err(ScopeError::Release(3));
        assert_release_failure!(release, 3);
    }

    #[test]
    #[should_panic(expected = "Expected release failure")]
    fn assert_release_failure_panics_on_operation_failure() {
        let result: Result<(), _> = Err(ScopeError::Operation("syntax"));
        assert_release_failure!(result);
    }
}
