//! Credential manager with proactive refresh and drift-forced
//! reauthorization
//!
//! Owns the in-memory credential and coordinates every renewal decision:
//! - Proactive refresh before expiry (configurable buffer, default 10 min)
//! - Reactive refresh when the provider reports the credential invalid
//! - Full reauthorization when the refresh token is missing, the grant is
//!   revoked, or the granted permission set has drifted from configuration
//! - A terminal unrecoverable state that fails fast instead of replaying
//!   interactive authorization on every tool call
//!
//! [`CredentialManager::ensure_valid`] is the single public entry point;
//! concurrent callers serialize on one lock so at most one refresh or
//! reauthorization is ever in flight.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::exchange::TokenExchanger;
use crate::scopes::ScopeManager;
use crate::store::CredentialStore;
use crate::types::Credential;

/// Seconds before literal expiry at which a credential is refreshed
pub const DEFAULT_REFRESH_BUFFER_SECONDS: i64 = 600;

/// Default bound on a single token-exchange call
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for [`CredentialManager`]
#[derive(Debug, Clone)]
pub struct CredentialManagerConfig {
    /// Refresh the credential this many seconds before it expires.
    /// Refreshing early avoids handing out a credential that expires while
    /// an API call built on it is still in flight.
    pub refresh_buffer_seconds: i64,

    /// Bound on each token-exchange call. An elapsed bound counts as a
    /// failed attempt; the next caller is eligible to retry.
    pub exchange_timeout: Duration,
}

impl Default for CredentialManagerConfig {
    fn default() -> Self {
        Self {
            refresh_buffer_seconds: DEFAULT_REFRESH_BUFFER_SECONDS,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// Observable lifecycle state of the managed credential
///
/// Updated only while the manager's lock is held; reads are a diagnostic
/// snapshot of the most recent decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// No credential loaded yet
    Uninitialized,
    /// First-time authorization in progress
    Authenticating,
    /// Credential usable as-is
    Valid,
    /// Credential expires within the refresh buffer
    NearExpiry,
    /// Provider reports the credential invalid despite its expiry
    Expired,
    /// Full reauthorization in progress (drift, revoked grant, or missing
    /// refresh token)
    Reauthenticating,
    /// Authorization failed terminally; every call fails fast until an
    /// operator intervenes
    Unrecoverable,
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Authenticating => "authenticating",
            Self::Valid => "valid",
            Self::NearExpiry => "near_expiry",
            Self::Expired => "expired",
            Self::Reauthenticating => "reauthenticating",
            Self::Unrecoverable => "unrecoverable",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug)]
struct ManagerInner {
    credential: Option<Credential>,
    state: CredentialState,
    /// Whether the store has been consulted; after the first load the
    /// in-memory credential is authoritative
    store_consulted: bool,
    /// Message replayed on every call once authorization failed terminally
    terminal_error: Option<String>,
}

/// Credential manager over a token exchanger and a credential store
///
/// Explicitly constructed and owned by the process composition root; every
/// tool invocation shares one instance by reference. Independent instances
/// are fully isolated, which is what makes the manager testable.
pub struct CredentialManager<X: TokenExchanger, S: CredentialStore> {
    exchanger: Arc<X>,
    store: Arc<S>,
    scopes: ScopeManager,
    config: CredentialManagerConfig,
    inner: Mutex<ManagerInner>,
}

impl<X: TokenExchanger, S: CredentialStore> CredentialManager<X, S> {
    /// Create a new credential manager
    ///
    /// # Arguments
    /// * `exchanger` - external token-exchange collaborator
    /// * `store` - credential persistence boundary
    /// * `scopes` - scope manager over the loaded configuration
    /// * `config` - refresh buffer and exchange timeout
    #[must_use]
    pub fn new(
        exchanger: X,
        store: S,
        scopes: ScopeManager,
        config: CredentialManagerConfig,
    ) -> Self {
        Self {
            exchanger: Arc::new(exchanger),
            store: Arc::new(store),
            scopes,
            config,
            inner: Mutex::new(ManagerInner {
                credential: None,
                state: CredentialState::Uninitialized,
                store_consulted: false,
                terminal_error: None,
            }),
        }
    }

    /// Load the persisted credential and validate the scope configuration
    ///
    /// Should be called on process startup. Skipping it is harmless; the
    /// first [`Self::ensure_valid`] call consults the store itself.
    ///
    /// # Returns
    /// `true` if a stored credential was found
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the scope configuration is
    /// invalid, `AuthError::Persistence` if a present record cannot be
    /// read.
    pub async fn initialize(&self) -> AuthResult<bool> {
        let mut inner = self.inner.lock().await;

        self.validated_required_scopes()?;

        inner.store_consulted = true;
        match self.store.load().await? {
            Some(credential) => {
                info!("credential manager initialized with stored credential");
                inner.credential = Some(credential);
                inner.state = CredentialState::Valid;
                Ok(true)
            }
            None => {
                debug!("no stored credential found");
                Ok(false)
            }
        }
    }

    /// Ensure a usable credential and return it
    ///
    /// The single public mutating entry point. Returns a credential whose
    /// granted permission set matches the required scopes and whose expiry
    /// lies beyond the refresh buffer, or fails with a typed error. Safe
    /// for concurrent use: callers serialize on one lock, so at most one
    /// refresh or reauthorization runs at a time and blocked callers
    /// re-evaluate the renewed credential instead of repeating the
    /// exchange.
    ///
    /// # Errors
    /// - `AuthError::Configuration`: scope configuration invalid; fix the
    ///   configuration file
    /// - `AuthError::Authorization`: exchange or authorization failed;
    ///   `terminal` set once the manager is unrecoverable
    /// - `AuthError::Persistence`: the stored credential could not be read
    ///   on first use
    /// - `AuthError::Timeout`: the exchange exceeded its bound; the next
    ///   caller may retry
    pub async fn ensure_valid(&self) -> AuthResult<Credential> {
        let mut inner = self.inner.lock().await;

        // Terminal failures replay without touching the exchanger, so a
        // permanently denied grant doesn't prompt on every tool call.
        if let Some(message) = inner.terminal_error.clone() {
            debug!("failing fast: authorization previously failed terminally");
            return Err(AuthError::terminal(message));
        }

        // Invalid configuration aborts the attempt before anything mutates;
        // authenticating with a partial scope set is never acceptable.
        let required = self.validated_required_scopes()?;

        if inner.credential.is_none() && !inner.store_consulted {
            inner.store_consulted = true;
            inner.credential = self.store.load().await?;
        }

        let Some(current) = inner.credential.clone() else {
            info!("no credential available, starting authorization");
            inner.state = CredentialState::Authenticating;
            return self.authorize_locked(&mut inner, &required).await;
        };

        // Drift overrides the expiry checks: a credential granting more or
        // less than the configuration requires is never silently accepted.
        if self.scopes.has_drift(&current.granted_scopes)? {
            inner.state = CredentialState::Reauthenticating;
            return self.authorize_locked(&mut inner, &required).await;
        }

        let near_expiry = current.is_expired(self.config.refresh_buffer_seconds);
        if !near_expiry && current.valid {
            inner.state = CredentialState::Valid;
            return Ok(current);
        }

        inner.state =
            if current.valid { CredentialState::NearExpiry } else { CredentialState::Expired };
        debug!(state = %inner.state, "credential needs renewal");

        if current.refresh_token.is_none() {
            info!("no refresh token available, starting reauthorization");
            inner.state = CredentialState::Reauthenticating;
            return self.authorize_locked(&mut inner, &required).await;
        }

        match timeout(self.config.exchange_timeout, self.exchanger.refresh(&current, &required))
            .await
        {
            Err(_) => {
                warn!(elapsed = ?self.config.exchange_timeout, "token refresh timed out");
                Err(AuthError::timeout("refresh", self.config.exchange_timeout))
            }
            Ok(Ok(refreshed)) => {
                info!("credential refreshed");
                Ok(self.install_locked(&mut inner, refreshed).await)
            }
            Ok(Err(err)) if err.is_retryable() => {
                warn!(error = %err, "token refresh failed transiently");
                Err(AuthError::authorization(format!("token refresh failed: {err}")))
            }
            Ok(Err(err)) => {
                info!(error = %err, "token refresh rejected, starting reauthorization");
                inner.state = CredentialState::Reauthenticating;
                self.authorize_locked(&mut inner, &required).await
            }
        }
    }

    /// Get the current lifecycle state
    pub async fn state(&self) -> CredentialState {
        self.inner.lock().await.state
    }

    /// Get a snapshot of the in-memory credential without triggering
    /// refresh or authorization
    pub async fn credential(&self) -> Option<Credential> {
        self.inner.lock().await.credential.clone()
    }

    /// Clear a terminal authorization failure
    ///
    /// The explicit operator escape hatch: after `reset` the next
    /// [`Self::ensure_valid`] call attempts authorization again instead of
    /// failing fast.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.terminal_error = None;
        inner.state = if inner.credential.is_some() {
            CredentialState::Valid
        } else {
            CredentialState::Uninitialized
        };
        info!("credential manager reset");
    }

    /// Get the refresh buffer in seconds
    #[must_use]
    pub fn refresh_buffer(&self) -> i64 {
        self.config.refresh_buffer_seconds
    }

    /// Get the scope manager
    #[must_use]
    pub fn scope_manager(&self) -> &ScopeManager {
        &self.scopes
    }

    /// Validate the scope configuration and compute the required scopes
    ///
    /// Runs before every authentication attempt; the error lists every
    /// failed check.
    fn validated_required_scopes(&self) -> AuthResult<Vec<String>> {
        let report = self.scopes.validate();
        if !report.ok {
            return Err(AuthError::configuration(report.errors.join("; ")));
        }
        self.scopes.required_scopes()
    }

    /// Run the full authorization flow and install the result
    ///
    /// Called with the lock held. Terminal failures record the message that
    /// every subsequent call replays.
    async fn authorize_locked(
        &self,
        inner: &mut ManagerInner,
        required: &[String],
    ) -> AuthResult<Credential> {
        match timeout(self.config.exchange_timeout, self.exchanger.authorize(required)).await {
            Err(_) => {
                warn!(elapsed = ?self.config.exchange_timeout, "authorization timed out");
                Err(AuthError::timeout("authorize", self.config.exchange_timeout))
            }
            Ok(Ok(credential)) => {
                info!("authorization succeeded");
                Ok(self.install_locked(inner, credential).await)
            }
            Ok(Err(err)) if err.is_retryable() => {
                warn!(error = %err, "authorization failed transiently");
                Err(AuthError::authorization(format!("authorization failed: {err}")))
            }
            Ok(Err(err)) => {
                let message = format!("authorization failed: {err}");
                error!(error = %err, "authorization failed terminally, operator intervention required");
                inner.state = CredentialState::Unrecoverable;
                inner.terminal_error = Some(message.clone());
                Err(AuthError::terminal(message))
            }
        }
    }

    /// Replace the in-memory credential and persist it
    ///
    /// Called with the lock held, so blocked callers observe the renewed
    /// credential as soon as they acquire it. A save failure degrades to
    /// memory-only operation; the next process restart re-authenticates.
    async fn install_locked(&self, inner: &mut ManagerInner, credential: Credential) -> Credential {
        if let Err(err) = self.store.save(&credential).await {
            warn!(error = %err, "failed to persist credential, continuing in memory only");
        }
        inner.credential = Some(credential.clone());
        inner.state = CredentialState::Valid;
        credential
    }
}

impl<X: TokenExchanger, S: CredentialStore> fmt::Debug for CredentialManager<X, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.config)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
