#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use njinn_api::config::ServerConfig;
use njinn_api::router::build_app_router;
use njinn_api::state::AppState;
use njinn_core::packages::reconciler::{Reconciler, LATEST};
use njinn_core::packages::{DependencyEnvironment, PackageManagerError, PackageRegistry};
use njinn_core::scripting::engine::ExecutionEngine;
use njinn_core::scripting::registry::ScriptRegistry;
use njinn_core::scripting::store::FsScriptStore;
use njinn_core::scripting::testing::DirectiveRuntime;
use njinn_events::{WebhookConfig, WebhookDelivery};
use njinn_worker::{JobQueue, QueueConfig};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(scripts_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        scripts_dir: scripts_dir.to_path_buf(),
        node_bin: "node".to_string(),
        npm_bin: "npm".to_string(),
        queue: QueueConfig { concurrency: 4 },
        webhook: WebhookConfig {
            timeout: Duration::from_secs(5),
            accept_invalid_certs: true,
        },
    }
}

// ---------------------------------------------------------------------------
// Fake package manager
// ---------------------------------------------------------------------------

/// In-memory npm: a fixed registry of latest versions plus an installed map.
#[derive(Default)]
pub struct FakeNpm {
    pub latest: Mutex<HashMap<String, String>>,
    pub installed: Mutex<HashMap<String, String>>,
    pub installs: Mutex<Vec<String>>,
    pub views: Mutex<Vec<String>>,
    pub failing: Mutex<Option<String>>,
    pub install_delay: Mutex<Option<Duration>>,
}

impl FakeNpm {
    pub fn publish(&self, package: &str, version: &str) {
        self.latest
            .lock()
            .unwrap()
            .insert(package.to_string(), version.to_string());
    }

    pub fn preinstall(&self, package: &str, version: &str) {
        self.installed
            .lock()
            .unwrap()
            .insert(package.to_string(), version.to_string());
    }

    pub fn fail_installs_of(&self, package: &str) {
        *self.failing.lock().unwrap() = Some(package.to_string());
    }

    /// Make every install take `delay` before it completes.
    pub fn delay_installs(&self, delay: Duration) {
        *self.install_delay.lock().unwrap() = Some(delay);
    }

    pub fn installed_version(&self, package: &str) -> Option<String> {
        self.installed.lock().unwrap().get(package).cloned()
    }

    pub fn install_calls(&self) -> Vec<String> {
        self.installs.lock().unwrap().clone()
    }

    pub fn view_calls(&self) -> Vec<String> {
        self.views.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageRegistry for FakeNpm {
    async fn latest_version(&self, package: &str) -> Result<String, PackageManagerError> {
        self.views.lock().unwrap().push(package.to_string());
        self.latest
            .lock()
            .unwrap()
            .get(package)
            .cloned()
            .ok_or_else(|| PackageManagerError::Failed {
                command: format!("npm view {package} version --json"),
                exit_code: 1,
                stderr: "npm ERR! code E404".to_string(),
            })
    }
}

#[async_trait]
impl DependencyEnvironment for FakeNpm {
    async fn ensure_initialized(&self) -> Result<(), PackageManagerError> {
        Ok(())
    }

    async fn installed_versions(&self) -> Result<HashMap<String, String>, PackageManagerError> {
        Ok(self.installed.lock().unwrap().clone())
    }

    async fn install(&self, package: &str, version: &str) -> Result<(), PackageManagerError> {
        self.installs
            .lock()
            .unwrap()
            .push(format!("{package}@{version}"));
        let delay = *self.install_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().as_deref() == Some(package) {
            return Err(PackageManagerError::Failed {
                command: format!("npm install {package}@{version}"),
                exit_code: 1,
                stderr: "npm ERR! code ETARGET".to_string(),
            });
        }
        let resolved = if version == LATEST {
            self.latest
                .lock()
                .unwrap()
                .get(package)
                .cloned()
                .unwrap_or_default()
        } else {
            version.to_string()
        };
        self.preinstall(package, &resolved);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// Fully wired application backed by fakes and a scratch scripts directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub npm: Arc<FakeNpm>,
    pub scripts_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn scripts_path(&self) -> &Path {
        self.scripts_dir.path()
    }
}

/// Build the full application router with all middleware layers.
///
/// Scripts are stored on disk in a temporary directory and run by
/// [`DirectiveRuntime`]; packages go to [`FakeNpm`]; webhook events are
/// delivered over real HTTP. Must be called from within a Tokio runtime.
pub fn build_test_app() -> TestApp {
    build_test_app_with(|_| {})
}

/// [`build_test_app`] with `configure` applied to the test configuration.
pub fn build_test_app_with(configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let scripts_dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(scripts_dir.path());
    configure(&mut config);

    let store = Arc::new(FsScriptStore::new(scripts_dir.path()));
    let registry = Arc::new(ScriptRegistry::new(store, DirectiveRuntime::shared()));
    let engine = Arc::new(ExecutionEngine::new(registry));

    let npm = Arc::new(FakeNpm::default());
    let reconciler = Arc::new(Reconciler::new(npm.clone(), npm.clone()));

    let notifier = Arc::new(WebhookDelivery::new(&config.webhook).expect("webhook client"));
    let queue = Arc::new(JobQueue::start(
        config.queue.clone(),
        Arc::clone(&engine),
        notifier,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        engine,
        reconciler,
        queue,
    };
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        npm,
        scripts_dir,
    }
}

// ---------------------------------------------------------------------------
// Webhook receiver
// ---------------------------------------------------------------------------

/// One webhook request as received.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub headers: HeaderMap,
    pub body: Value,
}

/// HTTP server on `127.0.0.1:0` recording every POST to `/webhook`.
#[derive(Clone)]
pub struct WebhookReceiver {
    pub url: String,
    received: Arc<Mutex<Vec<ReceivedEvent>>>,
}

impl WebhookReceiver {
    pub async fn start() -> Self {
        let received: Arc<Mutex<Vec<ReceivedEvent>>> = Arc::default();
        let app = Router::new()
            .route(
                "/webhook",
                post(
                    |State(received): State<Arc<Mutex<Vec<ReceivedEvent>>>>,
                     headers: HeaderMap,
                     Json(body): Json<Value>| async move {
                        received
                            .lock()
                            .unwrap()
                            .push(ReceivedEvent { headers, body });
                        StatusCode::OK
                    },
                ),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind webhook receiver");
        let addr = listener.local_addr().expect("receiver addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}/webhook"),
            received,
        }
    }

    pub fn events(&self) -> Vec<ReceivedEvent> {
        self.received.lock().unwrap().clone()
    }

    /// Bodies received for job `id`, in arrival order.
    pub fn bodies_for(&self, id: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .map(|e| e.body)
            .filter(|b| b["id"] == id)
            .collect()
    }

    /// Wait until at least `count` events arrived (panics after 5 s).
    pub async fn wait_for(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.received.lock().unwrap().len() < count {
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {count} webhook events"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: String) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}
