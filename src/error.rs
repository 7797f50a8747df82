//! Error type for scoped execution.
//!
//! A scoped run has three phases that can fail independently. [`ScopeError`]
//! records which one produced the final failure, and [`Phase`] names the
//! phases on their own for logging and matching.

use std::fmt;

/// The phase of a scoped run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    /// Obtaining a resource from the pool.
    Acquire,
    /// Running the operation against the resource.
    Operation,
    /// Returning the resource to the pool.
    Release,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Acquire => f.write_str("acquire"),
            Phase::Operation => f.write_str("operation"),
            Phase::Release => f.write_str("release"),
        }
    }
}

/// Error returned by a scoped run.
///
/// Exactly one cause survives. When the release fails, its cause replaces
/// whatever the operation produced, successful or not.
///
/// # Variants
///
/// - `Acquire` - no resource was obtained; nothing ran and nothing was released
/// - `Operation` - the operation failed and the release succeeded
/// - `Release` - the release failed; the operation outcome was discarded
///
/// # Example
///
/// ```rust
/// use poolscope::{Phase, ScopeError};
///
/// let err: ScopeError<&str> = ScopeError::Release("connection reset");
/// assert_eq!(err.phase(), Phase::Release);
/// assert_eq!(err.into_cause(), "connection reset");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError<E> {
    /// The pool could not hand out a resource.
    #[error("acquire failed: {0}")]
    Acquire(#[source] E),
    /// The operation failed; the resource was released cleanly.
    #[error("{0}")]
    Operation(#[source] E),
    /// Returning the resource to the pool failed.
    #[error("release failed: {0}")]
    Release(#[source] E),
}

impl<E> ScopeError<E> {
    /// The phase that produced this error.
    pub fn phase(&self) -> Phase {
        match self {
            ScopeError::Acquire(_) => Phase::Acquire,
            ScopeError::Operation(_) => Phase::Operation,
            ScopeError::Release(_) => Phase::Release,
        }
    }

    /// Borrow the underlying cause.
    pub fn cause(&self) -> &E {
        match self {
            ScopeError::Acquire(e) | ScopeError::Operation(e) | ScopeError::Release(e) => e,
        }
    }

    /// Extract the underlying cause, dropping the phase.
    pub fn into_cause(self) -> E {
        match self {
            ScopeError::Acquire(e) | ScopeError::Operation(e) | ScopeError::Release(e) => e,
        }
    }

    /// Returns `true` if the pool failed to hand out a resource.
    pub fn is_acquire(&self) -> bool {
        matches!(self, ScopeError::Acquire(_))
    }

    /// Returns `true` if the operation failed and the release succeeded.
    pub fn is_operation(&self) -> bool {
        matches!(self, ScopeError::Operation(_))
    }

    /// Returns `true` if the release failed.
    pub fn is_release(&self) -> bool {
        matches!(self, ScopeError::Release(_))
    }

    /// Maps the cause, keeping the phase.
    pub fn map<F, E2>(self, f: F) -> ScopeError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            ScopeError::Acquire(e) => ScopeError::Acquire(f(e)),
            ScopeError::Operation(e) => ScopeError::Operation(f(e)),
            ScopeError::Release(e) => ScopeError::Release(f(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn phase_matches_variant() {
        assert_eq!(ScopeError::Acquire(1).phase(), Phase::Acquire);
        assert_eq!(ScopeError::Operation(1).phase(), Phase::Operation);
        assert_eq!(ScopeError::Release(1).phase(), Phase::Release);
    }

    #[test]
    fn predicates_are_exclusive() {
        let err = ScopeError::Operation("boom");
        assert!(err.is_operation());
        assert!(!err.is_acquire());
        assert!(!err.is_release());
    }

    #[test]
    fn map_keeps_phase() {
        let err = ScopeError::Release(3).map(|n| n * 2);
        assert_eq!(err, ScopeError::Release(6));
    }

    #[test]
    fn display_prefixes_acquire_and_release() {
        assert_eq!(
            ScopeError::Acquire("timeout").to_string(),
            "acquire failed: timeout"
        );
        assert_eq!(ScopeError::Operation("syntax").to_string(), "syntax");
        assert_eq!(
            ScopeError::Release("reset").to_string(),
            "release failed: reset"
        );
    }

    #[test]
    fn source_is_the_cause() {
        let err = ScopeError::Release(io::Error::other("reset"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("reset"));
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Acquire.to_string(), "acquire");
        assert_eq!(Phase::Operation.to_string(), "operation");
        assert_eq!(Phase::Release.to_string(), "release");
    }
}
