//! Script registry with explicit cache invalidation.
//!
//! The registry maps each script name to a generation counter and, when it
//! has been loaded since the last save, the cached [`Executable`]. Saving
//! replaces the persisted source and then bumps the generation, which
//! invalidates the cache entry; loading reuses a cached executable only when
//! its generation is still current.
//!
//! Saves are serialized through a single writer lock, so two racing saves
//! to the same name resolve last-writer-wins and a load never observes a
//! half-written source.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::executor::{ScriptError, ScriptRuntime};
use super::store::{validate_script_name, ScriptStore};
use crate::error::CoreError;

/// The loaded, invocable form of one saved version of a script.
///
/// An executable keeps the exact source it was loaded from, so it keeps
/// running that version even if the script is saved again meanwhile.
pub struct Executable {
    name: String,
    generation: u64,
    source: Arc<str>,
    runtime: Arc<dyn ScriptRuntime>,
}

impl Executable {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry generation this executable was loaded at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the script with `context`.
    pub async fn invoke(&self, context: Value) -> Result<Value, ScriptError> {
        self.runtime.invoke(&self.name, &self.source, context).await
    }
}

impl fmt::Debug for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executable")
            .field("name", &self.name)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct CacheEntry {
    generation: u64,
    executable: Option<Arc<Executable>>,
}

/// Named script sources plus their cached executables.
pub struct ScriptRegistry {
    store: Arc<dyn ScriptStore>,
    runtime: Arc<dyn ScriptRuntime>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    writer: Mutex<()>,
}

impl ScriptRegistry {
    pub fn new(store: Arc<dyn ScriptStore>, runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self {
            store,
            runtime,
            entries: RwLock::new(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// Persist `source` under `name` and invalidate any cached executable.
    ///
    /// Once this returns, every subsequent [`load`](Self::load) of `name`
    /// yields the new source. Executions already holding an older
    /// [`Executable`] are unaffected.
    pub async fn save(&self, name: &str, source: &str) -> Result<(), CoreError> {
        validate_script_name(name)?;

        let _writer = self.writer.lock().await;
        self.store.write(name, source).await?;

        let mut entries = self.entries.write().await;
        let entry = entries.entry(name.to_string()).or_default();
        entry.generation += 1;
        entry.executable = None;

        tracing::info!(
            script = name,
            generation = entry.generation,
            bytes = source.len(),
            "Script saved",
        );
        Ok(())
    }

    /// Return the current executable for `name`.
    ///
    /// Reuses the cached executable if no save happened since it was
    /// loaded; otherwise re-reads the persisted source.
    pub async fn load(&self, name: &str) -> Result<Arc<Executable>, CoreError> {
        validate_script_name(name)?;

        let observed = {
            let entries = self.entries.read().await;
            match entries.get(name) {
                Some(CacheEntry {
                    generation,
                    executable: Some(executable),
                }) if executable.generation == *generation => {
                    return Ok(Arc::clone(executable));
                }
                Some(entry) => entry.generation,
                None => 0,
            }
        };

        let source = self
            .store
            .read(name)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "script",
                id: name.to_string(),
            })?;

        let executable = Arc::new(Executable {
            name: name.to_string(),
            generation: observed,
            source: Arc::from(source),
            runtime: Arc::clone(&self.runtime),
        });

        // Only cache if no save slipped in while the source was being read;
        // otherwise the next load re-reads.
        let mut entries = self.entries.write().await;
        let entry = entries.entry(name.to_string()).or_default();
        if entry.generation == observed {
            entry.executable = Some(Arc::clone(&executable));
        }
        tracing::debug!(script = name, generation = observed, "Script loaded");

        Ok(executable)
    }

    /// Current generation for `name` (0 if never saved by this process).
    pub async fn generation(&self, name: &str) -> u64 {
        self.entries
            .read()
            .await
            .get(name)
            .map_or(0, |entry| entry.generation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
