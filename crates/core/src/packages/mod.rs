//! Third-party dependencies for scripts.
//!
//! The [`Reconciler`](reconciler::Reconciler) compares requested packages
//! against the dependency environment and installs only what is missing or
//! out of date. Talking to the package registry and mutating the
//! environment go through the [`PackageRegistry`] and
//! [`DependencyEnvironment`] traits; [`npm::NpmClient`] implements both on
//! top of the `npm` CLI.

pub mod npm;
pub mod reconciler;

use std::collections::HashMap;

use async_trait::async_trait;

/// Errors from the package manager collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PackageManagerError {
    /// The package manager process could not be started.
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The package manager ran but exited unsuccessfully.
    #[error("`{command}` exited with code {exit_code}: {stderr}")]
    Failed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The package manager printed something we could not interpret.
    #[error("Unexpected output from `{command}`: {detail}")]
    Output { command: String, detail: String },
}

/// Read-only view of the package registry.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Resolve the version currently tagged `latest` for `package`.
    async fn latest_version(&self, package: &str) -> Result<String, PackageManagerError>;
}

/// The directory-local environment packages are installed into.
#[async_trait]
pub trait DependencyEnvironment: Send + Sync {
    /// Create the environment manifest if it does not exist yet.
    async fn ensure_initialized(&self) -> Result<(), PackageManagerError>;

    /// Top-level installed packages and their versions.
    async fn installed_versions(&self) -> Result<HashMap<String, String>, PackageManagerError>;

    /// Install `package` pinned to `version` (a concrete version or a tag
    /// such as `latest`).
    async fn install(&self, package: &str, version: &str) -> Result<(), PackageManagerError>;
}
