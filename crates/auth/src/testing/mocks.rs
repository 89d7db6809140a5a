//! Mock implementations of the exchange and persistence traits
//!
//! Provides in-memory doubles for testing the credential manager.

// Mocks keep their state behind std mutexes; poisoning is acceptable here
// because a panicking test fails anyway.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::exchange::{ExchangeError, TokenExchanger};
use crate::store::{CredentialStore, StoreError};
use crate::types::Credential;

type Scripted = Arc<Mutex<Option<ExchangeError>>>;

/// Mock token exchanger with scripted responses and call counting
///
/// By default `refresh` answers with a `"refreshed_access"` credential and
/// `authorize` with an `"authorized_access"` credential, both granting
/// exactly the requested scopes. Failures and latency are injected per
/// method.
#[derive(Clone, Debug)]
pub struct MockTokenExchanger {
    refresh_calls: Arc<Mutex<usize>>,
    authorize_calls: Arc<Mutex<usize>>,
    refresh_error: Scripted,
    authorize_error: Scripted,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockTokenExchanger {
    /// Create a new mock exchanger with default behavior
    pub fn new() -> Self {
        Self {
            refresh_calls: Arc::new(Mutex::new(0)),
            authorize_calls: Arc::new(Mutex::new(0)),
            refresh_error: Arc::new(Mutex::new(None)),
            authorize_error: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Make every `refresh` call fail with the given error
    pub fn set_refresh_error(&self, error: ExchangeError) {
        *self.refresh_error.lock().unwrap() = Some(error);
    }

    /// Restore the default `refresh` behavior
    pub fn clear_refresh_error(&self) {
        *self.refresh_error.lock().unwrap() = None;
    }

    /// Make every `authorize` call fail with the given error
    pub fn set_authorize_error(&self, error: ExchangeError) {
        *self.authorize_error.lock().unwrap() = Some(error);
    }

    /// Restore the default `authorize` behavior
    pub fn clear_authorize_error(&self) {
        *self.authorize_error.lock().unwrap() = None;
    }

    /// Delay every exchange call, e.g. to exercise timeouts or to hold the
    /// manager's critical section open under concurrency
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Remove the injected delay
    pub fn clear_delay(&self) {
        *self.delay.lock().unwrap() = None;
    }

    /// Number of `refresh` calls made
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        *self.refresh_calls.lock().unwrap()
    }

    /// Number of `authorize` calls made
    #[must_use]
    pub fn authorize_calls(&self) -> usize {
        *self.authorize_calls.lock().unwrap()
    }

    async fn apply_delay(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockTokenExchanger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenExchanger for MockTokenExchanger {
    async fn refresh(
        &self,
        credential: &Credential,
        scopes: &[String],
    ) -> Result<Credential, ExchangeError> {
        *self.refresh_calls.lock().unwrap() += 1;
        self.apply_delay().await;

        let scripted = self.refresh_error.lock().unwrap().clone();
        if let Some(error) = scripted {
            return Err(error);
        }

        Ok(Credential::new(
            "refreshed_access".to_string(),
            credential.refresh_token.clone(),
            3600,
            scopes.to_vec(),
        ))
    }

    async fn authorize(&self, scopes: &[String]) -> Result<Credential, ExchangeError> {
        *self.authorize_calls.lock().unwrap() += 1;
        self.apply_delay().await;

        let scripted = self.authorize_error.lock().unwrap().clone();
        if let Some(error) = scripted {
            return Err(error);
        }

        Ok(Credential::new(
            "authorized_access".to_string(),
            Some("authorized_refresh".to_string()),
            3600,
            scopes.to_vec(),
        ))
    }
}

/// In-memory credential store with failure injection
#[derive(Clone, Debug)]
pub struct MockCredentialStore {
    credential: Arc<Mutex<Option<Credential>>>,
    fail_load: Arc<Mutex<bool>>,
    fail_save: Arc<Mutex<bool>>,
    save_count: Arc<Mutex<usize>>,
}

impl MockCredentialStore {
    /// Create an empty store (first-run state)
    pub fn new() -> Self {
        Self {
            credential: Arc::new(Mutex::new(None)),
            fail_load: Arc::new(Mutex::new(false)),
            fail_save: Arc::new(Mutex::new(false)),
            save_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a store preloaded with a credential
    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::new();
        *store.credential.lock().unwrap() = Some(credential);
        store
    }

    /// Make every `load` call fail
    pub fn set_fail_load(&self, fail: bool) {
        *self.fail_load.lock().unwrap() = fail;
    }

    /// Make every `save` call fail
    pub fn set_fail_save(&self, fail: bool) {
        *self.fail_save.lock().unwrap() = fail;
    }

    /// Number of successful `save` calls
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.save_count.lock().unwrap()
    }

    /// Get the currently persisted credential
    #[must_use]
    pub fn stored(&self) -> Option<Credential> {
        self.credential.lock().unwrap().clone()
    }
}

impl Default for MockCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, StoreError> {
        if *self.fail_load.lock().unwrap() {
            return Err(StoreError::Io(std::io::Error::other("injected load failure")));
        }
        Ok(self.credential.lock().unwrap().clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        if *self.fail_save.lock().unwrap() {
            return Err(StoreError::Io(std::io::Error::other("injected save failure")));
        }
        *self.credential.lock().unwrap() = Some(credential.clone());
        *self.save_count.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the mock doubles themselves.
    use super::*;

    /// Validates the default exchanger responses and call counters.
    #[tokio::test]
    async fn test_mock_exchanger_defaults() {
        let exchanger = MockTokenExchanger::new();
        assert_eq!(exchanger.refresh_calls(), 0);

        let current = Credential::new(
            "old".to_string(),
            Some("refresh".to_string()),
            60,
            vec!["scope:calendar".to_string()],
        );
        let scopes = vec!["scope:calendar".to_string()];

        let refreshed =
            exchanger.refresh(&current, &scopes).await.expect("refresh should succeed");
        assert_eq!(refreshed.access_token, "refreshed_access");
        assert_eq!(refreshed.refresh_token, Some("refresh".to_string()));
        assert_eq!(exchanger.refresh_calls(), 1);

        let authorized = exchanger.authorize(&scopes).await.expect("authorize should succeed");
        assert_eq!(authorized.access_token, "authorized_access");
        assert!(authorized.granted_scopes.contains("scope:calendar"));
        assert_eq!(exchanger.authorize_calls(), 1);
    }

    /// Validates scripted failure injection and clearing.
    #[tokio::test]
    async fn test_mock_exchanger_failure_injection() {
        let exchanger = MockTokenExchanger::new();
        exchanger.set_authorize_error(ExchangeError::InvalidGrant("declined".to_string()));

        let result = exchanger.authorize(&[]).await;
        assert!(result.is_err());

        exchanger.clear_authorize_error();
        assert!(exchanger.authorize(&[]).await.is_ok());
    }

    /// Validates the store's failure injection and save counting.
    #[tokio::test]
    async fn test_mock_store_failure_injection() {
        let store = MockCredentialStore::new();
        assert!(store.load().await.expect("load should succeed").is_none());

        let credential = Credential::new("access".to_string(), None, 3600, Vec::new());
        store.save(&credential).await.expect("save should succeed");
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.stored().map(|c| c.access_token), Some("access".to_string()));

        store.set_fail_save(true);
        assert!(store.save(&credential).await.is_err());
        assert_eq!(store.save_count(), 1);

        store.set_fail_load(true);
        assert!(store.load().await.is_err());
    }
}
