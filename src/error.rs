//! Mimir error types

use std::fmt;
use std::time::Duration;

/// A single violated configuration constraint.
///
/// Collected by the `validate()` methods on the config types so callers
/// get every problem at once instead of fixing them one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Dotted path of the offending field (e.g. `"monitor.max_measurements"`).
    pub field: String,
    /// The rejected value, rendered for display.
    pub value: String,
    /// Human-readable constraint that was violated.
    pub constraint: String,
}

impl ConstraintViolation {
    pub fn new(
        field: impl Into<String>,
        value: impl fmt::Display,
        constraint: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} ({})", self.field, self.value, self.constraint)
    }
}

fn join_violations(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Mimir error types
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Configuration errors
    #[error("invalid configuration: {}", join_violations(.0))]
    Validation(Vec<ConstraintViolation>),

    #[error("configuration error: {0}")]
    Configuration(String),

    // Remote store errors
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("store operation '{operation}' failed: {message}")]
    StoreOperation {
        operation: &'static str,
        message: String,
    },

    #[error("store operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    // Data errors
    /// Stored bytes carry an unknown or truncated framing marker, or the
    /// payload behind a valid marker cannot be decoded.
    #[error("corrupt cache entry: {0}")]
    Decode(String),

    #[error("failed to encode cache entry: {0}")]
    Encode(String),
}

impl MimirError {
    /// Whether this error came from the remote store.
    ///
    /// Store errors are never surfaced to cache callers; the engine turns
    /// them into misses or logged no-ops.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            MimirError::StoreUnavailable(_)
                | MimirError::StoreOperation { .. }
                | MimirError::Timeout { .. }
        )
    }

    /// Violated constraints, if this is a validation error.
    pub fn violations(&self) -> &[ConstraintViolation] {
        match self {
            MimirError::Validation(v) => v,
            _ => &[],
        }
    }
}

/// Result type alias for Mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;
