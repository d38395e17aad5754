//! # Pipeline Configuration
//!
//! Backend selection, queue/store names and worker tuning.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RECEIPT_QUEUE=receipt_task_queue                                   │
//! │     RECEIPT_DATABASE=receipts                                          │
//! │     RECEIPT_BACKEND=redis                                              │
//! │     RECEIPT_WORKERS=4                                                  │
//! │     REDIS_URL=redis://cache:6379  (or REDIS_HOST=cache)                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     explicit path, or                                                  │
//! │     ~/.config/receipt-processor/pipeline.toml (Linux)                  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     in-memory backends, one worker                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # pipeline.toml
//! [broker]
//! backend = "redis"            # memory | redis
//! redis_url = "redis://127.0.0.1:6379"
//!
//! [queue]
//! name = "receipt_task_queue"
//! dead_letter = "receipt_dead_letter"
//! block_timeout_secs = 1
//!
//! [store]
//! namespace = "receipts"
//!
//! [worker]
//! count = 2
//! initial_backoff_ms = 500
//! max_backoff_secs = 30
//! max_put_attempts = 5
//! poll_interval_ms = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};

// =============================================================================
// Broker Backend
// =============================================================================

/// Which implementation backs the queue and the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerBackend {
    /// In-process channel and map. State dies with the process.
    #[default]
    Memory,

    /// Redis list and keys, shared by every process pointed at the server.
    Redis,
}

impl std::fmt::Display for BrokerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerBackend::Memory => write!(f, "memory"),
            BrokerBackend::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for BrokerBackend {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "mem" => Ok(BrokerBackend::Memory),
            "redis" => Ok(BrokerBackend::Redis),
            other => Err(PipelineError::InvalidConfig(format!(
                "Unknown backend: '{}'. Valid options: memory, redis",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[broker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    #[serde(default)]
    pub backend: BrokerBackend,

    /// Only read when `backend = "redis"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

/// `[queue]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Name of the work queue (the Redis list key).
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Queue receiving entries the worker could not store.
    /// Unset: such entries are logged and dropped.
    #[serde(default)]
    pub dead_letter: Option<String>,

    /// Server-side `BRPOP` timeout (seconds).
    #[serde(default = "default_block_timeout")]
    pub block_timeout_secs: u64,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Key prefix; receipts live under `<namespace>:<id>`.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// `[worker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Number of concurrent workers.
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// First backoff delay after a queue or store failure (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// `put` attempts per entry before it is dead-lettered or dropped.
    #[serde(default = "default_max_put_attempts")]
    pub max_put_attempts: u32,

    /// Longest single wait on the queue before the worker checks for
    /// shutdown again (milliseconds). Capped by `block_timeout_secs` on Redis.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl WorkerSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_queue_name() -> String {
    "receipt_task_queue".to_string()
}

fn default_block_timeout() -> u64 {
    1
}

fn default_namespace() -> String {
    "receipts".to_string()
}

fn default_worker_count() -> usize {
    1
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    30
}

fn default_max_put_attempts() -> u32 {
    5
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for BrokerSettings {
    fn default() -> Self {
        BrokerSettings {
            backend: BrokerBackend::default(),
            redis_url: default_redis_url(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            name: default_queue_name(),
            dead_letter: None,
            block_timeout_secs: default_block_timeout(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            namespace: default_namespace(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            count: default_worker_count(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_put_attempts: default_max_put_attempts(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub broker: BrokerSettings,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub worker: WorkerSettings,
}

impl PipelineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`pipeline.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> PipelineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading pipeline config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.queue.name.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "queue name must not be empty".into(),
            ));
        }

        if self.queue.dead_letter.as_deref() == Some(self.queue.name.as_str()) {
            return Err(PipelineError::InvalidConfig(
                "dead_letter must differ from the work queue name".into(),
            ));
        }

        if self.store.namespace.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "store namespace must not be empty".into(),
            ));
        }

        if self.broker.backend == BrokerBackend::Redis
            && !self.broker.redis_url.starts_with("redis://")
            && !self.broker.redis_url.starts_with("rediss://")
        {
            return Err(PipelineError::InvalidConfig(format!(
                "redis_url must start with redis:// or rediss://, got: {}",
                self.broker.redis_url
            )));
        }

        if self.queue.block_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "block_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.worker.count == 0 {
            return Err(PipelineError::InvalidConfig(
                "worker count must be greater than 0".into(),
            ));
        }

        if self.worker.max_put_attempts == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_put_attempts must be greater than 0".into(),
            ));
        }

        if self.worker.initial_backoff_ms == 0 || self.worker.max_backoff_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "initial_backoff_ms and max_backoff_secs must be greater than 0".into(),
            ));
        }

        if self.worker.initial_backoff() > self.worker.max_backoff() {
            return Err(PipelineError::InvalidConfig(format!(
                "initial_backoff_ms ({}) must not exceed max_backoff_secs ({}s)",
                self.worker.initial_backoff_ms, self.worker.max_backoff_secs
            )));
        }

        if self.worker.poll_interval_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides read through `lookup` (the process environment in
    /// [`load`](Self::load)).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("RECEIPT_QUEUE").filter(|v| !v.is_empty()) {
            debug!(queue = %name, "Overriding queue name from environment");
            self.queue.name = name;
        }

        if let Some(namespace) = lookup("RECEIPT_DATABASE").filter(|v| !v.is_empty()) {
            debug!(namespace = %namespace, "Overriding store namespace from environment");
            self.store.namespace = namespace;
        }

        if let Some(backend) = lookup("RECEIPT_BACKEND") {
            match backend.parse() {
                Ok(parsed) => self.broker.backend = parsed,
                Err(_) => warn!(backend = %backend, "Unknown backend in environment"),
            }
        }

        if let Some(url) = lookup("REDIS_URL") {
            debug!(url = %url, "Overriding Redis URL from environment");
            self.broker.redis_url = url;
        } else if let Some(host) = lookup("REDIS_HOST").filter(|v| !v.is_empty()) {
            self.broker.redis_url = format!("redis://{host}:6379");
        }

        if let Some(count) = lookup("RECEIPT_WORKERS") {
            match count.parse::<usize>() {
                Ok(n) => self.worker.count = n,
                Err(_) => warn!(count = %count, "Invalid worker count in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "receipt-processor", "receipt-processor")
            .map(|dirs| dirs.config_dir().join("pipeline.toml"))
    }

    /// Server-side `BRPOP` timeout.
    pub fn block_timeout(&self) -> Duration {
        Duration::from_secs(self.queue.block_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("memory".parse::<BrokerBackend>().unwrap(), BrokerBackend::Memory);
        assert_eq!("Redis".parse::<BrokerBackend>().unwrap(), BrokerBackend::Redis);
        assert!("postgres".parse::<BrokerBackend>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.broker.backend, BrokerBackend::Memory);
        assert_eq!(config.queue.name, "receipt_task_queue");
        assert_eq!(config.store.namespace, "receipts");
        assert_eq!(config.worker.count, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [broker]
            backend = "redis"

            [worker]
            count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.broker.backend, BrokerBackend::Redis);
        assert_eq!(config.broker.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.worker.count, 3);
        assert_eq!(config.worker.max_put_attempts, 5);
        assert_eq!(config.queue.dead_letter, None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(env(&[
            ("RECEIPT_QUEUE", "tasks"),
            ("RECEIPT_DATABASE", "points"),
            ("RECEIPT_BACKEND", "redis"),
            ("REDIS_HOST", "cache"),
            ("RECEIPT_WORKERS", "4"),
        ]));

        assert_eq!(config.queue.name, "tasks");
        assert_eq!(config.store.namespace, "points");
        assert_eq!(config.broker.backend, BrokerBackend::Redis);
        assert_eq!(config.broker.redis_url, "redis://cache:6379");
        assert_eq!(config.worker.count, 4);
    }

    #[test]
    fn test_redis_url_wins_over_host() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(env(&[
            ("REDIS_URL", "redis://primary:6380/2"),
            ("REDIS_HOST", "ignored"),
        ]));
        assert_eq!(config.broker.redis_url, "redis://primary:6380/2");
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(env(&[
            ("RECEIPT_BACKEND", "sqlite"),
            ("RECEIPT_WORKERS", "many"),
            ("RECEIPT_QUEUE", ""),
        ]));
        assert_eq!(config.broker.backend, BrokerBackend::Memory);
        assert_eq!(config.worker.count, 1);
        assert_eq!(config.queue.name, "receipt_task_queue");
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();
        config.worker.count = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.queue.dead_letter = Some(config.queue.name.clone());
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.broker.backend = BrokerBackend::Redis;
        config.broker.redis_url = "http://localhost".to_string();
        assert!(config.validate().is_err());

        config.broker.redis_url = "redis://localhost:6379".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_validation() {
        let mut config = PipelineConfig::default();
        config.worker.initial_backoff_ms = 0;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.worker.max_backoff_secs = 0;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.worker.initial_backoff_ms = 5_000;
        config.worker.max_backoff_secs = 2;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        config.worker.max_backoff_secs = 5;
        assert!(config.validate().is_ok());

        let mut config = PipelineConfig::default();
        config.worker.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("receipt-pipeline-does-not-exist.toml");
        let config = PipelineConfig::load(Some(path));
        // Env may override fields, but loading must still succeed.
        assert!(config.is_ok());
    }
}
