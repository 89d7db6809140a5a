//! Credential lifecycle and scope management for the Worksuite tool server.
//!
//! Every tool invocation that touches a Google Workspace API goes through
//! one shared [`CredentialManager`]: it owns the long-lived OAuth2
//! credential, refreshes it before expiry, escalates to full
//! reauthorization when refresh is impossible, and reconciles the granted
//! permission set against the user-editable integration configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ CredentialManager  │  ensure_valid(): the single entry point
//! └─────────┬──────────┘
//!           │
//!           ├──► ScopeManager       (required scopes, drift detection)
//!           ├──► CredentialStore    (versioned persisted record)
//!           └──► TokenExchanger     (external OAuth2 endpoint)
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use worksuite_auth::{
//!     CredentialManager, CredentialManagerConfig, FileCredentialStore, ScopeManager,
//! };
//! # use worksuite_auth::testing::MockTokenExchanger;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let exchanger = MockTokenExchanger::new();
//! let manager = CredentialManager::new(
//!     exchanger,
//!     FileCredentialStore::new("config/credential.json"),
//!     ScopeManager::from_file("config/scopes.json"),
//!     CredentialManagerConfig::default(),
//! );
//!
//! // Load any stored credential on startup.
//! manager.initialize().await?;
//!
//! // Every tool invocation asks for a usable credential.
//! let credential = manager.ensure_valid().await?;
//! println!("bearer token: {}", credential.access_token);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`types`]: the credential value object and its versioned stored form
//! - [`scopes`]: scope configuration, dependency closure, drift detection
//! - [`store`]: persistence boundary and the JSON file store
//! - [`exchange`]: the external token-exchange collaborator trait
//! - [`manager`]: the credential state machine
//! - [`error`]: error taxonomy and classification
//! - [`testing`]: in-memory doubles for the exchange and persistence seams

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod error;
pub mod exchange;
pub mod manager;
pub mod scopes;
pub mod store;
pub mod testing;
pub mod types;

// Re-export commonly used types
pub use error::{AuthError, AuthResult, ErrorClassification, ErrorSeverity};
pub use exchange::{ExchangeError, TokenExchanger};
pub use manager::{
    CredentialManager, CredentialManagerConfig, CredentialState, DEFAULT_EXCHANGE_TIMEOUT,
    DEFAULT_REFRESH_BUFFER_SECONDS,
};
pub use scopes::{ConfigSummary, ScopeConfig, ScopeManager, ValidationReport};
pub use store::{CredentialStore, FileCredentialStore, StoreError};
pub use types::{Credential, StoredCredential, CREDENTIAL_SCHEMA_VERSION};
