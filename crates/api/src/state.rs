use std::sync::Arc;

use njinn_core::packages::npm::NpmClient;
use njinn_core::packages::reconciler::Reconciler;
use njinn_core::scripting::engine::ExecutionEngine;
use njinn_core::scripting::node::NodeRuntime;
use njinn_core::scripting::registry::ScriptRegistry;
use njinn_core::scripting::store::FsScriptStore;
use njinn_events::{WebhookDelivery, WebhookError};
use njinn_worker::JobQueue;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs saved scripts; also owns the script registry.
    pub engine: Arc<ExecutionEngine>,
    /// Installs third-party packages into the scripts directory.
    pub reconciler: Arc<Reconciler>,
    /// Background job queue.
    pub queue: Arc<JobQueue>,
}

impl AppState {
    /// Wire the production components for `config`: file-backed scripts run
    /// by Node, npm for packages and HTTP webhook delivery.
    ///
    /// Starts the job queue, so must be called from within a Tokio runtime.
    pub fn from_config(config: ServerConfig) -> Result<Self, WebhookError> {
        let runtime = Arc::new(NodeRuntime::new(&config.node_bin, &config.scripts_dir));
        let store = Arc::new(FsScriptStore::new(&config.scripts_dir));
        let registry = Arc::new(ScriptRegistry::new(store, runtime));
        let engine = Arc::new(ExecutionEngine::new(registry));

        let npm = Arc::new(NpmClient::new(&config.npm_bin, &config.scripts_dir));
        let reconciler = Arc::new(Reconciler::new(npm.clone(), npm));

        let notifier = Arc::new(WebhookDelivery::new(&config.webhook)?);
        let queue = Arc::new(JobQueue::start(
            config.queue.clone(),
            Arc::clone(&engine),
            notifier,
        ));

        Ok(Self {
            config: Arc::new(config),
            engine,
            reconciler,
            queue,
        })
    }
}
