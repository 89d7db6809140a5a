//! Token-exchange collaborator trait
//!
//! The OAuth2 wire protocol (authorization-code flow, token endpoint,
//! consent browser) lives outside this crate. [`TokenExchanger`] abstracts
//! it to the two call shapes the credential manager needs: refreshing an
//! existing credential and obtaining a brand new one. This seam is also
//! what makes the manager testable without a network.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Credential;

/// Error type for token-exchange operations
///
/// The manager escalates differently depending on the variant, so the
/// distinction between a dead grant and a flaky network matters here.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// The grant is invalid or revoked; refreshing will never succeed and
    /// a full reauthorization is required
    #[error("invalid or revoked grant: {0}")]
    InvalidGrant(String),

    /// Client credentials (secrets file) are missing or unreadable; no
    /// authorization flow can be started until an operator fixes it
    #[error("client credentials unavailable: {0}")]
    MissingCredentials(String),

    /// Transient failure (network, provider hiccup); a later attempt may
    /// succeed
    #[error("transient exchange failure: {0}")]
    Transient(String),
}

impl ExchangeError {
    /// Check if a later attempt may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Trait for the external token-exchange endpoint
///
/// Implementations perform the actual OAuth2 calls. Both methods take the
/// full required scope list so the issued credential always records the
/// permission set it was granted.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Refresh an existing credential using its refresh token
    ///
    /// # Arguments
    /// * `credential` - the current credential; its refresh token drives
    ///   the call
    /// * `scopes` - the permission identifiers the refreshed credential
    ///   must carry
    ///
    /// # Errors
    /// Returns [`ExchangeError::InvalidGrant`] when the grant was revoked,
    /// [`ExchangeError::Transient`] for recoverable failures.
    async fn refresh(
        &self,
        credential: &Credential,
        scopes: &[String],
    ) -> Result<Credential, ExchangeError>;

    /// Run the full (interactive or out-of-band) authorization flow
    ///
    /// # Arguments
    /// * `scopes` - the permission identifiers to request
    ///
    /// # Errors
    /// Returns [`ExchangeError::MissingCredentials`] when no client
    /// credentials exist, [`ExchangeError::InvalidGrant`] when the user
    /// declines, [`ExchangeError::Transient`] for recoverable failures.
    async fn authorize(&self, scopes: &[String]) -> Result<Credential, ExchangeError>;
}

#[cfg(test)]
mod tests {
    //! Unit tests for exchange error classification.
    use super::*;

    /// Validates `ExchangeError::is_retryable` per variant.
    #[test]
    fn test_retryability_per_variant() {
        assert!(ExchangeError::Transient("connection reset".to_string()).is_retryable());
        assert!(!ExchangeError::InvalidGrant("revoked".to_string()).is_retryable());
        assert!(!ExchangeError::MissingCredentials("no secrets file".to_string()).is_retryable());
    }

    /// Validates display formatting carries the underlying detail.
    #[test]
    fn test_display_detail() {
        let err = ExchangeError::InvalidGrant("refresh token revoked".to_string());
        assert!(err.to_string().contains("refresh token revoked"));
    }
}
