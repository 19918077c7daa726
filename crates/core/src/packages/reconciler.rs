//! Dependency reconciliation.
//!
//! For each requested package the reconciler decides whether the installed
//! version already satisfies the request:
//!
//! - an explicit version is satisfied only by exactly that version;
//! - no version (or the `latest` tag) is satisfied by the version the
//!   registry currently tags `latest`.
//!
//! Everything else is installed, one package at a time in request order.
//! The first install failure aborts the whole call. Calls are serialized so
//! only one reconciliation mutates the environment manifest at a time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{DependencyEnvironment, PackageManagerError, PackageRegistry};

/// Tag meaning "whatever the registry currently publishes".
pub const LATEST: &str = "latest";

/// Maximum length of a package name (npm limit).
const MAX_PACKAGE_NAME_LEN: usize = 214;

/// A package the caller wants available.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestedPackage {
    #[serde(alias = "name")]
    pub package: String,
    /// Desired version; `None` means latest.
    #[serde(default)]
    pub version: Option<String>,
}

impl RequestedPackage {
    pub fn new(package: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            package: package.into(),
            version: version.map(str::to_string),
        }
    }

    /// Explicitly pinned version, treating the `latest` tag as unpinned.
    fn pinned_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| *v != LATEST)
    }
}

/// Snapshot of one requested package as found in the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledPackage {
    pub name: String,
    pub installed: String,
    pub latest: String,
}

/// What reconciliation did for one requested package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PackageAction {
    /// Already satisfied; no install performed.
    Skipped { package: String, version: String },
    /// Installed at `version` (a concrete version or `latest`).
    Installed { package: String, version: String },
}

/// Reconciliation failure. Packages installed earlier in the same call stay
/// installed.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Invalid package request: {0}")]
    InvalidPackage(String),

    #[error("Failed to prepare dependency environment: {0}")]
    Environment(#[source] PackageManagerError),

    #[error("Failed to resolve latest version of {package}: {source}")]
    Resolve {
        package: String,
        #[source]
        source: PackageManagerError,
    },

    #[error("Failed to install {package}@{version}: {source}")]
    Install {
        package: String,
        version: String,
        #[source]
        source: PackageManagerError,
    },
}

/// Validate a requested package before anything touches the registry.
///
/// Rules:
/// - Name must not be empty or exceed `MAX_PACKAGE_NAME_LEN` characters.
/// - Name and version must not start with `-` (would read as a CLI flag).
/// - Neither may contain whitespace or control characters.
pub fn validate_package(request: &RequestedPackage) -> Result<(), InstallError> {
    let name = request.package.as_str();
    if name.is_empty() {
        return Err(InstallError::InvalidPackage(
            "package name is required".to_string(),
        ));
    }
    if name.len() > MAX_PACKAGE_NAME_LEN {
        return Err(InstallError::InvalidPackage(format!(
            "package name must not exceed {MAX_PACKAGE_NAME_LEN} characters"
        )));
    }
    check_token("package name", name)?;
    if let Some(version) = request.version.as_deref() {
        if version.is_empty() {
            return Err(InstallError::InvalidPackage(format!(
                "version for {name} must not be empty"
            )));
        }
        check_token("version", version)?;
    }
    Ok(())
}

fn check_token(what: &str, value: &str) -> Result<(), InstallError> {
    if value.starts_with('-') {
        return Err(InstallError::InvalidPackage(format!(
            "{what} '{value}' must not start with '-'"
        )));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(InstallError::InvalidPackage(format!(
            "{what} '{value}' must not contain whitespace"
        )));
    }
    Ok(())
}

/// Installs requested packages that are missing or at the wrong version.
pub struct Reconciler {
    registry: Arc<dyn PackageRegistry>,
    environment: Arc<dyn DependencyEnvironment>,
    manifest_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn PackageRegistry>,
        environment: Arc<dyn DependencyEnvironment>,
    ) -> Self {
        Self {
            registry,
            environment,
            manifest_lock: Mutex::new(()),
        }
    }

    /// Bring the environment in line with `requested`.
    ///
    /// Returns one [`PackageAction`] per requested package, in request order.
    pub async fn reconcile(
        &self,
        requested: &[RequestedPackage],
    ) -> Result<Vec<PackageAction>, InstallError> {
        for request in requested {
            validate_package(request)?;
        }

        let _manifest = self.manifest_lock.lock().await;

        self.environment
            .ensure_initialized()
            .await
            .map_err(InstallError::Environment)?;
        let mut installed = self
            .environment
            .installed_versions()
            .await
            .map_err(InstallError::Environment)?;

        let mut latest_versions: HashMap<String, String> = HashMap::new();
        let mut actions = Vec::with_capacity(requested.len());

        for request in requested {
            let package = request.package.as_str();
            let target = request.pinned_version().unwrap_or(LATEST);

            let satisfied = match (installed.get(package), request.pinned_version()) {
                (None, _) => false,
                (Some(current), Some(pinned)) => current == pinned,
                (Some(current), None) => {
                    let latest = self.resolve_latest(package, &mut latest_versions).await?;
                    *current == latest
                }
            };

            if satisfied {
                let version = installed.get(package).cloned().unwrap_or_default();
                tracing::debug!(package, %version, "Package already satisfied");
                actions.push(PackageAction::Skipped {
                    package: package.to_string(),
                    version,
                });
                continue;
            }

            tracing::info!(package, version = target, "Installing package");
            self.environment
                .install(package, target)
                .await
                .map_err(|source| InstallError::Install {
                    package: package.to_string(),
                    version: target.to_string(),
                    source,
                })?;

            // Keep the snapshot current for repeated names later in the request.
            match request.pinned_version() {
                Some(pinned) => {
                    installed.insert(package.to_string(), pinned.to_string());
                }
                None => match latest_versions.get(package) {
                    Some(latest) => {
                        installed.insert(package.to_string(), latest.clone());
                    }
                    None => {
                        installed.remove(package);
                    }
                },
            }

            actions.push(PackageAction::Installed {
                package: package.to_string(),
                version: target.to_string(),
            });
        }

        Ok(actions)
    }

    /// Snapshot of the requested packages that are currently installed.
    ///
    /// Resolves `latest` once per distinct package. Waits for any running
    /// reconciliation so the snapshot never shows a half-applied request.
    pub async fn inspect(
        &self,
        requested: &[RequestedPackage],
    ) -> Result<Vec<InstalledPackage>, InstallError> {
        for request in requested {
            validate_package(request)?;
        }

        let _manifest = self.manifest_lock.lock().await;
        let installed = self
            .environment
            .installed_versions()
            .await
            .map_err(InstallError::Environment)?;

        let mut latest_versions = HashMap::new();
        let mut snapshot = Vec::new();
        for request in requested {
            let Some(current) = installed.get(&request.package) else {
                continue;
            };
            if snapshot
                .iter()
                .any(|p: &InstalledPackage| p.name == request.package)
            {
                continue;
            }
            let latest = self
                .resolve_latest(&request.package, &mut latest_versions)
                .await?;
            snapshot.push(InstalledPackage {
                name: request.package.clone(),
                installed: current.clone(),
                latest,
            });
        }
        Ok(snapshot)
    }

    /// Resolve `latest` for `package`, at most once per call.
    async fn resolve_latest(
        &self,
        package: &str,
        cache: &mut HashMap<String, String>,
    ) -> Result<String, InstallError> {
        if let Some(version) = cache.get(package) {
            return Ok(version.clone());
        }
        let version = self
            .registry
            .latest_version(package)
            .await
            .map_err(|source| InstallError::Resolve {
                package: package.to_string(),
                source,
            })?;
        cache.insert(package.to_string(), version.clone());
        Ok(version)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
