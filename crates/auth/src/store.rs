//! Credential persistence boundary
//!
//! [`CredentialStore`] is the opaque load/save seam the manager talks to;
//! [`FileCredentialStore`] is the JSON file implementation the server ships
//! with. A stored record written under a different schema version is
//! reported as "no stored credential" so the manager reauthorizes instead
//! of failing on a record it cannot interpret.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{Credential, StoredCredential, CREDENTIAL_SCHEMA_VERSION};

/// Error type for credential store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file I/O failed
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A current-version record could not be encoded or decoded
    #[error("credential record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for credential persistence
///
/// `load` returning `Ok(None)` is a normal first-run outcome, not an
/// error. `save` failures are surfaced to the caller and never silently
/// retried; the caller decides whether to continue with an unpersisted
/// in-memory credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the persisted credential, if any
    ///
    /// # Errors
    /// Returns an error only when a present, current-version record cannot
    /// be read. Absent or foreign-format records yield `Ok(None)`.
    async fn load(&self) -> Result<Option<Credential>, StoreError>;

    /// Persist the credential, replacing any previous record
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    async fn save(&self, credential: &Credential) -> Result<(), StoreError>;
}

/// JSON file credential store
///
/// Writes go through a temp file and rename so a crash mid-write never
/// leaves a truncated record. On Unix the record is created with owner-only
/// permissions.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by the given file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the backing file path
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored credential");
                return Ok(None);
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        // Peek at the schema version before committing to the full record
        // shape. A foreign or pre-versioning record forces reauthorization
        // rather than a decode error.
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "stored credential is not a recognizable record, ignoring it"
                );
                return Ok(None);
            }
        };

        let version = value.get("schema_version").and_then(serde_json::Value::as_u64);
        if version != Some(u64::from(CREDENTIAL_SCHEMA_VERSION)) {
            warn!(
                path = %self.path.display(),
                found = ?version,
                expected = CREDENTIAL_SCHEMA_VERSION,
                "stored credential has a different schema version, reauthorization required"
            );
            return Ok(None);
        }

        let record: StoredCredential = serde_json::from_value(value)?;
        debug!(path = %self.path.display(), "loaded stored credential");
        Ok(Some(record.into()))
    }

    async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let record = StoredCredential::from(credential);
        let raw = serde_json::to_string_pretty(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw.as_bytes()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the file credential store.
    use super::*;
    use crate::types::Credential;

    fn sample_credential() -> Credential {
        Credential::new(
            "access_123".to_string(),
            Some("refresh_456".to_string()),
            3600,
            vec!["scope:calendar".to_string(), "scope:gmail".to_string()],
        )
    }

    /// Validates the save-then-load round trip, including scope-set
    /// equality and the expiry timestamp.
    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FileCredentialStore::new(dir.path().join("credential.json"));

        let credential = sample_credential();
        store.save(&credential).await.expect("save should succeed");

        let loaded = store
            .load()
            .await
            .expect("load should succeed")
            .expect("credential should be present");
        assert_eq!(loaded, credential);
    }

    /// Validates that a missing file is a normal first-run outcome.
    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FileCredentialStore::new(dir.path().join("credential.json"));

        let loaded = store.load().await.expect("load should succeed");
        assert!(loaded.is_none());
    }

    /// Validates that a record written under a different schema version is
    /// reported as absent, forcing reauthorization.
    #[tokio::test]
    async fn test_schema_version_mismatch_is_none() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("credential.json");
        std::fs::write(
            &path,
            br#"{"schema_version": 99, "access_token": "old", "granted_scopes": [], "valid": true}"#,
        )
        .expect("write should succeed");

        let store = FileCredentialStore::new(path);
        let loaded = store.load().await.expect("load should succeed");
        assert!(loaded.is_none());
    }

    /// Validates that an unparseable record (e.g. the pre-versioning binary
    /// format) is reported as absent rather than as a decode error.
    #[tokio::test]
    async fn test_foreign_format_is_none() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("credential.json");
        std::fs::write(&path, [0x80, 0x04, 0x95, 0x10]).expect("write should succeed");

        let store = FileCredentialStore::new(path);
        let loaded = store.load().await.expect("load should succeed");
        assert!(loaded.is_none());
    }

    /// Validates that a current-version record with a broken shape is a
    /// real error: same-version corruption must not be mistaken for a
    /// first run.
    #[tokio::test]
    async fn test_corrupt_current_version_record_is_error() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("credential.json");
        std::fs::write(&path, br#"{"schema_version": 1, "access_token": 42}"#)
            .expect("write should succeed");

        let store = FileCredentialStore::new(path);
        let result = store.load().await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    /// Validates that saving creates missing parent directories.
    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FileCredentialStore::new(dir.path().join("nested/config/credential.json"));

        store.save(&sample_credential()).await.expect("save should succeed");
        assert!(store.path().exists());
    }

    /// Validates that the record on disk is owner-readable only.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FileCredentialStore::new(dir.path().join("credential.json"));
        store.save(&sample_credential()).await.expect("save should succeed");

        let mode = std::fs::metadata(store.path())
            .expect("metadata should be readable")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
