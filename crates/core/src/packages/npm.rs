//! `npm`-backed package registry and dependency environment.
//!
//! All commands run with the scripts directory as working directory, so
//! packages land in `<scripts_dir>/node_modules` where the Node runtime
//! resolves them from.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;

use super::{DependencyEnvironment, PackageManagerError, PackageRegistry};
use crate::scripting::executor::ScriptError;
use crate::scripting::subprocess::{run_command, ProcessOutput};

/// Drives the `npm` CLI inside one directory.
#[derive(Debug, Clone)]
pub struct NpmClient {
    npm_bin: String,
    work_dir: PathBuf,
}

impl NpmClient {
    pub fn new(npm_bin: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            npm_bin: npm_bin.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Run `npm <args>` and return its output regardless of exit code.
    async fn npm(&self, args: &[&str]) -> Result<(String, ProcessOutput), PackageManagerError> {
        let command = format!("{} {}", self.npm_bin, args.join(" "));
        let mut cmd = Command::new(&self.npm_bin);
        cmd.args(args).current_dir(&self.work_dir);

        let output = run_command(&mut cmd, Vec::new())
            .await
            .map_err(|e| match e {
                ScriptError::IoError(source) => PackageManagerError::Spawn {
                    command: command.clone(),
                    source,
                },
                other => PackageManagerError::Output {
                    command: command.clone(),
                    detail: other.to_string(),
                },
            })?;

        tracing::debug!(
            command = %command,
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "npm finished",
        );
        Ok((command, output))
    }

    /// Run `npm <args>` and fail on a nonzero exit code.
    async fn npm_checked(&self, args: &[&str]) -> Result<ProcessOutput, PackageManagerError> {
        let (command, output) = self.npm(args).await?;
        if output.exit_code != 0 {
            return Err(PackageManagerError::Failed {
                command,
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl PackageRegistry for NpmClient {
    async fn latest_version(&self, package: &str) -> Result<String, PackageManagerError> {
        let output = self
            .npm_checked(&["view", package, "version", "--json"])
            .await?;
        parse_npm_view(&output.stdout).map_err(|detail| PackageManagerError::Output {
            command: format!("{} view {package} version", self.npm_bin),
            detail,
        })
    }
}

#[async_trait]
impl DependencyEnvironment for NpmClient {
    async fn ensure_initialized(&self) -> Result<(), PackageManagerError> {
        let manifest = self.work_dir.join("package.json");
        if tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
            return Ok(());
        }
        tracing::info!(dir = %self.work_dir.display(), "Initializing package manifest");
        self.npm_checked(&["init", "-y"]).await?;
        Ok(())
    }

    async fn installed_versions(&self) -> Result<HashMap<String, String>, PackageManagerError> {
        // `npm ls` exits nonzero on extraneous or invalid trees but still
        // prints the JSON listing.
        let (command, output) = self.npm(&["ls", "--depth=0", "--json"]).await?;
        match parse_npm_list(&output.stdout) {
            Ok(installed) => Ok(installed),
            Err(_) if output.exit_code != 0 => Err(PackageManagerError::Failed {
                command,
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            }),
            Err(detail) => Err(PackageManagerError::Output { command, detail }),
        }
    }

    async fn install(&self, package: &str, version: &str) -> Result<(), PackageManagerError> {
        let spec = format!("{package}@{version}");
        self.npm_checked(&["install", &spec]).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct NpmList {
    #[serde(default)]
    dependencies: HashMap<String, NpmListEntry>,
}

#[derive(Deserialize)]
struct NpmListEntry {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    missing: bool,
}

/// Parse `npm ls --depth=0 --json` into `name -> version`.
///
/// Entries declared in the manifest but absent from `node_modules` are
/// reported as missing and left out.
pub fn parse_npm_list(stdout: &str) -> Result<HashMap<String, String>, String> {
    if stdout.trim().is_empty() {
        return Ok(HashMap::new());
    }
    let list: NpmList = serde_json::from_str(stdout).map_err(|e| e.to_string())?;
    Ok(list
        .dependencies
        .into_iter()
        .filter(|(_, entry)| !entry.missing)
        .filter_map(|(name, entry)| entry.version.map(|v| (name, v)))
        .collect())
}

/// Parse `npm view <pkg> version --json`.
///
/// npm prints a JSON string, or an array when several versions match.
pub fn parse_npm_view(stdout: &str) -> Result<String, String> {
    match serde_json::from_str::<Value>(stdout.trim()).map_err(|e| e.to_string())? {
        Value::String(version) => Ok(version),
        Value::Array(versions) => versions
            .iter()
            .rev()
            .find_map(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| "empty version list".to_string()),
        other => Err(format!("unexpected version value: {other}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
