//! Credential value object and its persisted form
//!
//! [`Credential`] is the in-memory credential owned by the manager. It is
//! never partially edited; refresh and reauthorization replace it wholesale.
//!
//! [`StoredCredential`] is the serialized record the store round-trips. The
//! record carries an explicit `schema_version` so a credential written by an
//! older build is detected and triggers reauthorization instead of a
//! deserialization failure.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version of the persisted credential record
pub const CREDENTIAL_SCHEMA_VERSION: u32 = 1;

/// OAuth2 credential with granted-scope metadata
///
/// Combines the access/refresh token pair with the absolute expiry
/// timestamp and the permission set the authorization server actually
/// granted. The `valid` flag is the provider-reported structural validity,
/// distinct from expiry math: a revoked grant reports `valid = false` even
/// while its expiry timestamp lies in the future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Bearer token for API authentication
    pub access_token: String,

    /// Refresh token for obtaining new access tokens.
    /// Optional because some grant types don't issue one.
    pub refresh_token: Option<String>,

    /// Absolute expiration timestamp (UTC); `None` for credentials that
    /// never expire (service-account style grants)
    pub expires_at: Option<DateTime<Utc>>,

    /// Permission identifiers granted by the authorization server
    pub granted_scopes: BTreeSet<String>,

    /// Provider-reported validity; false once the grant is revoked
    pub valid: bool,
}

impl Credential {
    /// Create a new `Credential` with a calculated expiration time
    ///
    /// # Arguments
    /// * `access_token` - the access token
    /// * `refresh_token` - optional refresh token
    /// * `expires_in` - token lifetime in seconds; `<= 0` means no expiry
    /// * `granted_scopes` - the permission identifiers the server granted
    #[must_use]
    pub fn new<I>(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        granted_scopes: I,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let expires_at = if expires_in > 0 {
            Some(Utc::now() + chrono::Duration::seconds(expires_in))
        } else {
            None
        };

        Self {
            access_token,
            refresh_token,
            expires_at,
            granted_scopes: granted_scopes.into_iter().collect(),
            valid: true,
        }
    }

    /// Check if the credential is expired or will expire within the given
    /// threshold
    ///
    /// # Arguments
    /// * `threshold_seconds` - seconds before literal expiry at which the
    ///   credential already counts as expired
    ///
    /// # Returns
    /// `true` if expired or expiring within the threshold, `false` if still
    /// valid beyond the threshold or if no expiry is set
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let threshold = chrono::Duration::seconds(threshold_seconds);
                Utc::now() + threshold >= expires_at
            }
            None => false,
        }
    }

    /// Get seconds until expiration
    ///
    /// # Returns
    /// `Some(seconds)` if an expiry is set, `None` otherwise
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }

    /// Check whether the granted permission set equals `required` as a set
    #[must_use]
    pub fn scopes_match(&self, required: &BTreeSet<String>) -> bool {
        self.granted_scopes == *required
    }
}

/// Versioned on-disk form of a [`Credential`]
///
/// The persistence boundary treats this record as opaque; only the
/// [`crate::store`] module constructs and consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Record layout version; see [`CREDENTIAL_SCHEMA_VERSION`]
    pub schema_version: u32,

    pub access_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub granted_scopes: BTreeSet<String>,

    pub valid: bool,
}

impl From<&Credential> for StoredCredential {
    fn from(credential: &Credential) -> Self {
        Self {
            schema_version: CREDENTIAL_SCHEMA_VERSION,
            access_token: credential.access_token.clone(),
            refresh_token: credential.refresh_token.clone(),
            expires_at: credential.expires_at,
            granted_scopes: credential.granted_scopes.clone(),
            valid: credential.valid,
        }
    }
}

impl From<StoredCredential> for Credential {
    fn from(record: StoredCredential) -> Self {
        Self {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            expires_at: record.expires_at,
            granted_scopes: record.granted_scopes,
            valid: record.valid,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the credential value object.
    use super::*;

    fn scope_set(scopes: &[&str]) -> BTreeSet<String> {
        scopes.iter().map(|s| (*s).to_string()).collect()
    }

    /// Validates `Credential::new` behavior for the credential creation
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms token fields and scope set are stored.
    /// - Ensures `expires_at.is_some()` evaluates to true.
    /// - Ensures a fresh credential reports `valid`.
    #[test]
    fn test_credential_creation() {
        let credential = Credential::new(
            "access_token_123".to_string(),
            Some("refresh_token_456".to_string()),
            3600,
            vec!["scope:calendar".to_string(), "scope:gmail".to_string()],
        );

        assert_eq!(credential.access_token, "access_token_123");
        assert_eq!(credential.refresh_token, Some("refresh_token_456".to_string()));
        assert!(credential.expires_at.is_some());
        assert_eq!(credential.granted_scopes, scope_set(&["scope:calendar", "scope:gmail"]));
        assert!(credential.valid);
    }

    /// Validates `Credential::new` behavior when no expiry is issued.
    ///
    /// Assertions:
    /// - Ensures `expires_at.is_none()` evaluates to true.
    /// - Ensures `!credential.is_expired(600)` evaluates to true.
    /// - Ensures `seconds_until_expiry().is_none()` evaluates to true.
    #[test]
    fn test_credential_without_expiry() {
        let credential = Credential::new("access".to_string(), None, 0, Vec::new());

        assert!(credential.expires_at.is_none());
        assert!(!credential.is_expired(600));
        assert!(credential.seconds_until_expiry().is_none());
    }

    /// Validates `Credential::is_expired` behavior for the expiry threshold
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `!credential.is_expired(300)` evaluates to true.
    /// - Ensures `credential.is_expired(7200)` evaluates to true.
    #[test]
    fn test_expiry_threshold() {
        let credential = Credential::new(
            "access".to_string(),
            Some("refresh".to_string()),
            3600,
            Vec::new(),
        );

        assert!(!credential.is_expired(300));
        assert!(credential.is_expired(7200));
    }

    /// Validates `Credential::seconds_until_expiry` behavior.
    ///
    /// Assertions:
    /// - Ensures the value is close to the issued lifetime.
    #[test]
    fn test_seconds_until_expiry() {
        let credential = Credential::new("access".to_string(), None, 3600, Vec::new());

        let seconds = credential.seconds_until_expiry().expect("expiry should be set");
        assert!(seconds > 3590 && seconds <= 3600);
    }

    /// Validates `Credential::scopes_match` behavior for the set equality
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures equality is insensitive to insertion order.
    /// - Ensures a subset does not match.
    #[test]
    fn test_scopes_match_is_order_insensitive() {
        let credential = Credential::new(
            "access".to_string(),
            None,
            3600,
            vec!["scope:gmail".to_string(), "scope:calendar".to_string()],
        );

        assert!(credential.scopes_match(&scope_set(&["scope:calendar", "scope:gmail"])));
        assert!(!credential.scopes_match(&scope_set(&["scope:calendar"])));
        assert!(!credential.scopes_match(&scope_set(&[
            "scope:calendar",
            "scope:gmail",
            "scope:drive"
        ])));
    }

    /// Validates the stored-record conversion round trip.
    ///
    /// Assertions:
    /// - Confirms the record carries the current schema version.
    /// - Confirms all fields survive `Credential` -> `StoredCredential` ->
    ///   `Credential`.
    #[test]
    fn test_stored_record_round_trip() {
        let credential = Credential::new(
            "access".to_string(),
            Some("refresh".to_string()),
            3600,
            vec!["scope:calendar".to_string()],
        );

        let record = StoredCredential::from(&credential);
        assert_eq!(record.schema_version, CREDENTIAL_SCHEMA_VERSION);

        let restored = Credential::from(record);
        assert_eq!(restored, credential);
    }

    /// Validates that the stored record serializes the schema version first
    /// so foreign records can be detected before full deserialization.
    #[test]
    fn test_stored_record_serializes_schema_version() {
        let credential = Credential::new("access".to_string(), None, 3600, Vec::new());
        let record = StoredCredential::from(&credential);

        let json = serde_json::to_string(&record).expect("serialization should succeed");
        assert!(json.contains("\"schema_version\":1"));
    }
}
