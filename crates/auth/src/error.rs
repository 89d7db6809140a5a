//! Error types for the credential lifecycle subsystem
//!
//! The taxonomy distinguishes the three things a caller can do about a
//! failure:
//!
//! - `Configuration`: fix the scope configuration file (never retried)
//! - `Authorization`: re-run the authorization flow; `terminal` marks the
//!   fail-fast replay of a permanently failed authorization
//! - `Persistence` / `Timeout`: transient environment trouble
//!
//! All error types implement [`ErrorClassification`] so callers can drive
//! retry decisions without matching on variants.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Standard result type for credential lifecycle operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Error type for credential lifecycle operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// Scope configuration is invalid or incomplete.
    ///
    /// The message names the offending integration or mapping so the user
    /// can fix the configuration file. Never retried.
    #[error("invalid scope configuration: {message}")]
    Configuration { message: String },

    /// Token exchange or interactive authorization failed.
    ///
    /// `terminal` is true once the manager has entered its unrecoverable
    /// state; every subsequent call replays the same error until an
    /// operator intervenes.
    #[error("authorization failed: {message}")]
    Authorization { message: String, terminal: bool },

    /// Credential store read or write failed.
    #[error("credential store error: {0}")]
    Persistence(#[from] StoreError),

    /// A token-exchange call exceeded its configured bound.
    ///
    /// The attempt counts as failed; the next caller is eligible to retry.
    #[error("operation '{operation}' timed out after {elapsed:?}")]
    Timeout { operation: &'static str, elapsed: Duration },
}

impl AuthError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a non-terminal authorization error
    pub fn authorization<S: Into<String>>(message: S) -> Self {
        Self::Authorization { message: message.into(), terminal: false }
    }

    /// Create a terminal authorization error
    pub fn terminal<S: Into<String>>(message: S) -> Self {
        Self::Authorization { message: message.into(), terminal: true }
    }

    /// Create a timeout error
    pub fn timeout(operation: &'static str, elapsed: Duration) -> Self {
        Self::Timeout { operation, elapsed }
    }

    /// Check whether this error is the fail-fast replay of a terminal
    /// authorization failure
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authorization { terminal: true, .. })
    }
}

impl ErrorClassification for AuthError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration { .. } => false,
            Self::Authorization { terminal, .. } => !terminal,
            Self::Persistence(_) => true,
            Self::Timeout { .. } => true,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration { .. } => ErrorSeverity::Error,
            Self::Authorization { terminal: true, .. } => ErrorSeverity::Critical,
            Self::Authorization { terminal: false, .. } => ErrorSeverity::Error,
            Self::Persistence(_) => ErrorSeverity::Error,
            Self::Timeout { .. } => ErrorSeverity::Warning,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Error classification trait for consistent handling across modules
///
/// Provides a standard interface for classifying errors by their
/// characteristics, enabling consistent retry logic and alerting without
/// matching on concrete variants.
pub trait ErrorClassification {
    /// Check if the failed operation may succeed when attempted again
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this error requires immediate operator attention
    fn is_critical(&self) -> bool;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
