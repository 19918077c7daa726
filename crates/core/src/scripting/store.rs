//! Persistence of script sources.
//!
//! [`ScriptStore`] is the seam to whatever holds script text; the
//! [`FsScriptStore`] implementation keeps one file per script, named after
//! the script id, in a dedicated directory.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::error::CoreError;

/// Names that would collide with the dependency environment sharing the
/// scripts directory.
const RESERVED_NAMES: [&str; 3] = ["package.json", "package-lock.json", "node_modules"];

/// Maximum length of a script name in bytes (common filesystem limit).
const MAX_NAME_LEN: usize = 255;

/// Validate a script name.
///
/// Rules:
/// - Must not be empty or exceed `MAX_NAME_LEN` bytes.
/// - Must be a single path component: no `/`, `\` or NUL, and not starting
///   with `.` (covers `.`, `..` and the store's temporary files).
/// - Must not be one of the dependency-manifest names.
pub fn validate_script_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation("id is required".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Script id must not exceed {MAX_NAME_LEN} bytes"
        )));
    }
    if name.starts_with('.') || name.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
        return Err(CoreError::Validation(format!(
            "Script id '{name}' must be a plain file name"
        )));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(CoreError::Validation(format!(
            "Script id '{name}' is reserved"
        )));
    }
    Ok(())
}

/// Durable storage for script sources keyed by script name.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Replace the source stored under `name`.
    ///
    /// Readers must observe either the previous or the new source in full,
    /// never a partial write.
    async fn write(&self, name: &str, source: &str) -> Result<(), CoreError>;

    /// Read the source stored under `name`, or `None` if nothing was saved.
    async fn read(&self, name: &str) -> Result<Option<String>, CoreError>;
}

/// One file per script inside `root`.
#[derive(Debug, Clone)]
pub struct FsScriptStore {
    root: PathBuf,
}

impl FsScriptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ScriptStore for FsScriptStore {
    async fn write(&self, name: &str, source: &str) -> Result<(), CoreError> {
        fs::create_dir_all(&self.root).await?;

        // Write to a hidden sibling and rename over the target so the
        // replacement is atomic on the same filesystem.
        let target = self.root.join(name);
        let staging = self
            .root
            .join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&staging, source).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<String>, CoreError> {
        match fs::read_to_string(self.root.join(name)).await {
            Ok(source) => Ok(Some(source)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // -- validate_script_name -------------------------------------------------

    #[test]
    fn plain_file_name_is_valid() {
        assert!(validate_script_name("abc.js").is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        assert_matches!(validate_script_name(""), Err(CoreError::Validation(_)));
    }

    #[test]
    fn path_traversal_rejected() {
        assert!(validate_script_name("../etc/passwd").is_err());
        assert!(validate_script_name("nested/abc.js").is_err());
        assert!(validate_script_name("..").is_err());
    }

    #[test]
    fn manifest_names_rejected() {
        assert!(validate_script_name("package.json").is_err());
        assert!(validate_script_name("node_modules").is_err());
    }

    #[test]
    fn overlong_name_rejected() {
        assert!(validate_script_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    // -- FsScriptStore --------------------------------------------------------

    #[tokio::test]
    async fn write_creates_file_named_after_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsScriptStore::new(dir.path().join("generated"));

        store
            .write("abc.js", "console.log('abc')")
            .await
            .expect("write");

        let contents = std::fs::read_to_string(dir.path().join("generated/abc.js")).expect("read");
        assert_eq!(contents, "console.log('abc')");
    }

    #[tokio::test]
    async fn overwrite_replaces_contents_and_leaves_no_staging_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsScriptStore::new(dir.path());

        store.write("abc.js", "first").await.expect("write 1");
        store.write("abc.js", "second").await.expect("write 2");

        assert_eq!(
            store.read("abc.js").await.expect("read"),
            Some("second".to_string())
        );
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("abc.js")]);
    }

    #[tokio::test]
    async fn read_missing_script_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsScriptStore::new(dir.path());
        assert_eq!(store.read("missing.js").await.expect("read"), None);
    }
}
