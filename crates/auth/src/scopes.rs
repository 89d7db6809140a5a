//! Scope configuration and required-permission computation
//!
//! Translates the user-editable enabled-integrations configuration into the
//! flat permission set an authorization request must carry:
//!
//! - [`ScopeConfig`]: the on-disk record (enabled flags, dependency map,
//!   permission mapping, descriptions) with a built-in default registry
//! - [`ScopeManager`]: dependency-closure computation, validation, and
//!   drift detection against a previously granted permission set
//!
//! Configuration is loaded once per process; the manager treats it as
//! immutable afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{AuthError, AuthResult};

/// User-editable scope configuration
///
/// Mirrors the configuration file format: which integrations are enabled,
/// which integrations require which others, and the permission identifier
/// each integration maps to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Enabled/disabled flag per integration
    pub enabled_integrations: BTreeMap<String, bool>,

    /// Integration dependency map (e.g. "docs" requires "drive")
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// Integration name to permission identifier mapping
    pub scope_mappings: BTreeMap<String, String>,

    /// Human-readable integration descriptions for the setup surface
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
}

impl Default for ScopeConfig {
    /// The built-in registry used when no configuration file exists:
    /// every integration enabled, with the documented dependency map.
    fn default() -> Self {
        let owned = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
        };

        let enabled_integrations = ["calendar", "gmail", "docs", "sheets", "slides", "drive"]
            .into_iter()
            .map(|name| (name.to_string(), true))
            .collect();

        let dependencies = ["docs", "sheets", "slides"]
            .into_iter()
            .map(|name| (name.to_string(), vec!["drive".to_string()]))
            .collect();

        Self {
            enabled_integrations,
            dependencies,
            scope_mappings: owned(&[
                ("calendar", "https://www.googleapis.com/auth/calendar"),
                ("gmail", "https://www.googleapis.com/auth/gmail.modify"),
                ("docs", "https://www.googleapis.com/auth/documents"),
                ("sheets", "https://www.googleapis.com/auth/spreadsheets"),
                ("slides", "https://www.googleapis.com/auth/presentations"),
                ("drive", "https://www.googleapis.com/auth/drive.file"),
            ]),
            descriptions: owned(&[
                ("calendar", "Create, view, and manage calendar events"),
                ("gmail", "Send, read, and manage email messages"),
                ("docs", "Create and edit documents"),
                ("sheets", "Create and edit spreadsheets"),
                ("slides", "Create and edit presentations"),
                ("drive", "Access Drive files (required for docs/sheets/slides)"),
            ]),
        }
    }
}

impl ScopeConfig {
    /// Load configuration from a JSON file, falling back to the built-in
    /// default when the file is missing or unreadable
    ///
    /// A missing file is the expected first-run outcome and logs at warn;
    /// an unparseable file logs at error. Neither aborts startup, so a
    /// broken configuration edit degrades to the defaults instead of taking
    /// the server down.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "scope config not found, using defaults");
                return Self::default();
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to read scope config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(config) => {
                info!(path = %path.display(), "loaded scope configuration");
                config
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to parse scope config, using defaults");
                Self::default()
            }
        }
    }

    /// Save the configuration to a JSON file
    ///
    /// Creates parent directories as needed.
    ///
    /// # Errors
    /// Returns `AuthError::Persistence` if the directory cannot be created
    /// or the file cannot be written.
    pub fn save(&self, path: &Path) -> AuthResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::store::StoreError::from)?;
        }

        let raw = serde_json::to_string_pretty(self).map_err(crate::store::StoreError::from)?;
        std::fs::write(path, raw).map_err(crate::store::StoreError::from)?;

        info!(path = %path.display(), "scope configuration saved");
        Ok(())
    }
}

/// Validation outcome for a scope configuration
///
/// `errors` names every failed check so a user can fix the whole file in
/// one pass instead of replaying validation once per mistake.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
}

/// Summary of the active scope configuration for the setup surface
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub config_path: Option<String>,
    pub enabled_integrations: Vec<String>,
    pub required_scopes: Vec<String>,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub descriptions: BTreeMap<String, String>,
}

/// Scope manager over a loaded [`ScopeConfig`]
///
/// Computes the minimal closed permission set for the enabled integrations
/// and detects drift between a granted permission set and the currently
/// required one.
#[derive(Debug, Clone)]
pub struct ScopeManager {
    config: ScopeConfig,
    config_path: Option<PathBuf>,
}

impl ScopeManager {
    /// Create a manager over an already-loaded configuration
    #[must_use]
    pub fn new(config: ScopeConfig) -> Self {
        Self { config, config_path: None }
    }

    /// Create a manager by loading the configuration file at `path`,
    /// falling back to the built-in defaults if it is missing or invalid
    #[must_use]
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = ScopeConfig::load(&path);
        Self { config, config_path: Some(path) }
    }

    /// Get the integrations flagged enabled in the configuration
    #[must_use]
    pub fn enabled_integrations(&self) -> BTreeSet<String> {
        self.config
            .enabled_integrations
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Check if a specific integration is enabled
    #[must_use]
    pub fn is_integration_enabled(&self, integration: &str) -> bool {
        self.config.enabled_integrations.get(integration).copied().unwrap_or(false)
    }

    /// Get the description for an integration, with a generated fallback
    #[must_use]
    pub fn description(&self, integration: &str) -> String {
        self.config
            .descriptions
            .get(integration)
            .cloned()
            .unwrap_or_else(|| format!("{integration} integration"))
    }

    /// Compute the dependency closure over the enabled integrations
    ///
    /// Follows the dependency map transitively, so enabling an integration
    /// pulls in everything it needs. Recomputing is idempotent.
    fn required_integrations(&self) -> BTreeSet<String> {
        let mut closed = self.enabled_integrations();
        let mut worklist: Vec<String> = closed.iter().cloned().collect();

        while let Some(integration) = worklist.pop() {
            if let Some(deps) = self.config.dependencies.get(&integration) {
                for dep in deps {
                    if closed.insert(dep.clone()) {
                        worklist.push(dep.clone());
                    }
                }
            }
        }

        closed
    }

    /// Compute the permission identifiers required by the enabled
    /// integrations and their dependency closure
    ///
    /// # Returns
    /// Sorted, deduplicated permission identifiers. Sorting keeps the
    /// result stable across calls so authorization requests are
    /// reproducible.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` naming the integration if any
    /// closure member lacks a permission mapping.
    pub fn required_scopes(&self) -> AuthResult<Vec<String>> {
        let required = self.required_integrations();

        let mut scopes = BTreeSet::new();
        for integration in &required {
            match self.config.scope_mappings.get(integration) {
                Some(scope) => {
                    scopes.insert(scope.clone());
                }
                None => {
                    return Err(AuthError::configuration(format!(
                        "missing scope mapping for integration: {integration}"
                    )));
                }
            }
        }

        debug!(integrations = ?required, scopes = ?scopes, "computed required scopes");
        Ok(scopes.into_iter().collect())
    }

    /// Validate the configuration
    ///
    /// Checks that the required sections are populated, that every enabled
    /// integration's dependencies are also enabled, and that every
    /// integration in the required closure has a permission mapping. Pure;
    /// does not mutate state.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();

        if self.config.enabled_integrations.is_empty() {
            errors.push("missing required config section: enabled_integrations".to_string());
        }
        if self.config.scope_mappings.is_empty() {
            errors.push("missing required config section: scope_mappings".to_string());
        }
        if !errors.is_empty() {
            return ValidationReport { ok: false, errors };
        }

        let enabled = self.enabled_integrations();
        for integration in &enabled {
            if let Some(deps) = self.config.dependencies.get(integration) {
                for dep in deps {
                    if !self.is_integration_enabled(dep) {
                        errors.push(format!(
                            "integration '{integration}' requires '{dep}' to be enabled"
                        ));
                    }
                }
            }
        }

        for integration in &self.required_integrations() {
            if !self.config.scope_mappings.contains_key(integration) {
                errors.push(format!("missing scope mapping for integration: {integration}"));
            }
        }

        ValidationReport { ok: errors.is_empty(), errors }
    }

    /// Check whether a granted permission set has drifted from the
    /// currently required one
    ///
    /// Drift is set inequality in either direction: a subset cannot satisfy
    /// newly enabled integrations, and a superset indicates stale
    /// configuration that should be re-minimized. A credential with no
    /// recorded scopes is therefore always drifted while any scope is
    /// required; an absent scopes field is never grounds to skip the check.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the required set itself cannot
    /// be computed.
    pub fn has_drift(&self, granted: &BTreeSet<String>) -> AuthResult<bool> {
        let required: BTreeSet<String> = self.required_scopes()?.into_iter().collect();
        let drifted = *granted != required;

        if drifted {
            info!(
                granted = ?granted,
                required = ?required,
                "scope drift detected, reauthorization required"
            );
        }

        Ok(drifted)
    }

    /// Get a summary of the active configuration for the setup surface
    #[must_use]
    pub fn summary(&self) -> ConfigSummary {
        let report = self.validate();
        let enabled: Vec<String> = self.enabled_integrations().into_iter().collect();
        let descriptions =
            enabled.iter().map(|name| (name.clone(), self.description(name))).collect();

        ConfigSummary {
            config_path: self.config_path.as_ref().map(|p| p.display().to_string()),
            enabled_integrations: enabled,
            required_scopes: self.required_scopes().unwrap_or_default(),
            is_valid: report.ok,
            errors: report.errors,
            descriptions,
        }
    }

    /// Get the underlying configuration
    #[must_use]
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }
}
