//! # API Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RXPOS_PORT=8080                                                    │
//! │     RXPOS_DB_PATH=/var/lib/rxpos/rxpos.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     path from RXPOS_CONFIG or the first CLI argument                   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "rxpos.db"
//! max_connections = 8
//! busy_timeout_ms = 5000
//!
//! [sales]
//! max_discount_percent = 20.0   # omit to leave discounts uncapped
//!
//! [audit]
//! queue_capacity = 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use rxpos_db::DbConfig;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the lock held by another writer.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("rxpos.db")
}

fn default_max_connections() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseSettings {
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(self.path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

/// Checkout policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesSettings {
    /// Server-side discount cap in percent. `None` accepts any 0..=100.
    #[serde(default)]
    pub max_discount_percent: Option<f64>,
}

/// Audit recorder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Events buffered before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            queue_capacity: default_queue_capacity(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub audit: AuditSettings,
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file, if a path is given
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&contents)?
            }
            None => {
                debug!("No config file given, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if let Some(max) = self.sales.max_discount_percent {
            if !max.is_finite() || !(0.0..=100.0).contains(&max) {
                return Err(ConfigError::Invalid(format!(
                    "sales.max_discount_percent must be within 0..=100, got {}",
                    max
                )));
            }
        }

        if self.audit.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "audit.queue_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("RXPOS_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid RXPOS_PORT"),
            }
        }

        if let Ok(addr) = std::env::var("RXPOS_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Ok(path) = std::env::var("RXPOS_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("RXPOS_MAX_DISCOUNT_PERCENT") {
            match max.parse::<f64>() {
                Ok(m) => self.sales.max_discount_percent = Some(m),
                Err(_) => warn!(value = %max, "Ignoring invalid RXPOS_MAX_DISCOUNT_PERCENT"),
            }
        }

        if let Ok(capacity) = std::env::var("RXPOS_AUDIT_QUEUE") {
            match capacity.parse::<usize>() {
                Ok(c) => self.audit.queue_capacity = c,
                Err(_) => warn!(value = %capacity, "Ignoring invalid RXPOS_AUDIT_QUEUE"),
            }
        }
    }
}
