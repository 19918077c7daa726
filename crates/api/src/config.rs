use std::path::PathBuf;
use std::time::Duration;

use njinn_events::WebhookConfig;
use njinn_worker::QueueConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    /// Empty by default: cross-origin browser calls are refused.
    pub cors_origins: Vec<String>,
    /// Timeout in seconds for the prompt routes (default: `300`). Script
    /// execution and package installs are not bounded by it.
    pub request_timeout_secs: u64,
    /// Grace period for in-flight jobs after the server stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory holding script files and the package manifest
    /// (default: `./generated`).
    pub scripts_dir: PathBuf,
    /// Node.js interpreter binary (default: `node`).
    pub node_bin: String,
    /// npm binary (default: `npm`).
    pub npm_bin: String,
    /// Job queue settings.
    pub queue: QueueConfig,
    /// Webhook client settings.
    pub webhook: WebhookConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | (none)                  |
    /// | `REQUEST_TIMEOUT_SECS`         | `300`                   |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                    |
    /// | `SCRIPTS_DIR`                  | `./generated`           |
    /// | `NODE_BIN`                     | `node`                  |
    /// | `NPM_BIN`                      | `npm`                   |
    /// | `QUEUE_CONCURRENCY`            | `100`                   |
    /// | `WEBHOOK_TIMEOUT_SECS`         | `10`                    |
    /// | `WEBHOOK_ACCEPT_INVALID_CERTS` | `true`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_list(&std::env::var("CORS_ORIGINS").unwrap_or_default());

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let scripts_dir =
            PathBuf::from(std::env::var("SCRIPTS_DIR").unwrap_or_else(|_| "./generated".into()));
        let node_bin = std::env::var("NODE_BIN").unwrap_or_else(|_| "node".into());
        let npm_bin = std::env::var("NPM_BIN").unwrap_or_else(|_| "npm".into());

        let concurrency: usize = std::env::var("QUEUE_CONCURRENCY")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("QUEUE_CONCURRENCY must be a valid usize");

        let webhook_timeout_secs: u64 = std::env::var("WEBHOOK_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("WEBHOOK_TIMEOUT_SECS must be a valid u64");

        let accept_invalid_certs = parse_bool(
            &std::env::var("WEBHOOK_ACCEPT_INVALID_CERTS").unwrap_or_else(|_| "true".into()),
        )
        .expect("WEBHOOK_ACCEPT_INVALID_CERTS must be true or false");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            scripts_dir,
            node_bin,
            npm_bin,
            queue: QueueConfig { concurrency },
            webhook: WebhookConfig {
                timeout: Duration::from_secs(webhook_timeout_secs),
                accept_invalid_certs,
            },
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Split a comma-separated list, dropping blank entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Accepts `true`/`false`, `1`/`0` and `yes`/`no`, case-insensitively.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_list_drops_blank_entries() {
        assert!(parse_list("").is_empty());
        assert_eq!(
            parse_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
