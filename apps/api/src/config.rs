//! API process configuration.
//!
//! Loaded from environment variables with fallback to defaults. Pipeline
//! settings (backend, queue, store, workers) live in
//! [`PipelineConfig`](receipt_pipeline::PipelineConfig); `RECEIPT_CONFIG`
//! points at its TOML file.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use receipt_pipeline::{BrokerBackend, PipelineConfig};
use serde::{Deserialize, Serialize};

/// Which parts of the system this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// HTTP server only.
    Api,
    /// Worker pool only.
    Worker,
    /// HTTP server and worker pool.
    #[default]
    All,
}

impl Role {
    pub fn serves_http(&self) -> bool {
        matches!(self, Role::Api | Role::All)
    }

    pub fn runs_workers(&self) -> bool {
        matches!(self, Role::Worker | Role::All)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Api => write!(f, "api"),
            Role::Worker => write!(f, "worker"),
            Role::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" | "server" => Ok(Role::Api),
            "worker" | "backend" => Ok(Role::Worker),
            "all" => Ok(Role::All),
            _ => Err(ConfigError::InvalidValue("RECEIPT_ROLE".to_string())),
        }
    }
}

/// API process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen address
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// Process role
    pub role: Role,

    /// Pipeline TOML file (default: platform config dir)
    pub pipeline_config: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            role: Role::default(),
            pipeline_config: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),

            port: match lookup("PORT") {
                Some(port) => port
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                None => defaults.port,
            },

            role: match lookup("RECEIPT_ROLE") {
                Some(role) => role.parse()?,
                None => defaults.role,
            },

            pipeline_config: lookup("RECEIPT_CONFIG").map(PathBuf::from),
        };

        Ok(config)
    }

    /// Socket address to bind the HTTP listener to.
    ///
    /// `bind_addr` is a bare IPv4 or IPv6 address; IPv6 may be bracketed.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.bind_addr.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let ip: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BIND_ADDR".to_string()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Rejects role/backend combinations where nothing would drain the queue.
    ///
    /// In-memory backends are private to one process, so split roles only
    /// work over Redis.
    pub fn check_backend(&self, pipeline: &PipelineConfig) -> Result<(), ConfigError> {
        if self.role != Role::All && pipeline.broker.backend == BrokerBackend::Memory {
            return Err(ConfigError::RoleNeedsSharedBackend(self.role));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Role '{0}' requires the redis backend")]
    RoleNeedsSharedBackend(Role),
}
