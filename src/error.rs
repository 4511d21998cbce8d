//! Error types for the route handler harness.
//!
//! Every failure is raised synchronously to the immediate caller. Nothing is
//! caught or retried internally: an injection either completes (the handler
//! ran and its control signal was observed) or an error aborts it before any
//! response becomes authoritative.
//!
//! # Error Categories
//!
//! | Category | Variants | Raised by |
//! |----------|----------|-----------|
//! | Configuration | `Config`, `Json` | `Session::new`, `Session::inject`, options parsing |
//! | Invalid operation | `InvalidOperation` | `created()`, `set_state()`, `entity()` |
//! | Programming assertion | `Assertion` | header composition with unresolvable options |
//!
//! # Examples
//!
//! ```
//! use route_harness::HarnessError;
//!
//! let err = HarnessError::Config("missing path".into());
//! assert!(err.is_configuration());
//! assert!(err.to_string().contains("missing path"));
//! ```

use thiserror::Error;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while constructing or driving a harness session.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarnessError {
    /// Malformed construction or injection options.
    ///
    /// Raised at the boundary before any handler code runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Options supplied as JSON could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An operation was invoked in a context its contract forbids.
    ///
    /// For example `created()` on a GET request, `set_state()` with a
    /// reserved option, or `entity()` without an etag or modified date.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An internal invariant was violated.
    #[error("Assertion failed: {0}")]
    Assertion(String),
}

impl HarnessError {
    /// Check if this error rejects construction or injection options.
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, HarnessError::Config(_) | HarnessError::Json(_))
    }

    /// Check if this error rejects an operation invoked by a handler.
    #[inline]
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, HarnessError::InvalidOperation(_))
    }
}
