//! ==============================================================================
//! config.rs - relay configuration loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `relay.toml`.
//!     loads configuration from file or falls back to defaults, then lets
//!     the process environment override individual values.
//!
//! structure:
//!     - ServerConfig: where to listen and how long a request may take.
//!     - AuthConfig: the ingest secret (normally only from INGEST_TOKEN).
//!     - LoggingConfig: default log filter when RUST_LOG is unset.
//!
//! environment:
//!     RELAY_CONFIG  explicit config file path (errors are fatal)
//!     PORT          listen port (default 8787)
//!     RELAY_BIND    listen address (default 0.0.0.0)
//!     INGEST_TOKEN  write secret, required
//!     RELAY_LOG     log level
//!
//! ==============================================================================

use crate::auth::IngestToken;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8787;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub ingest_token: Option<String>,
}

// keep the secret out of logs and panics
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "ingest_token",
                &self.ingest_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Load with default fallback
    ///
    /// an explicit RELAY_CONFIG path must load; the well-known locations
    /// are best effort.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("RELAY_CONFIG") {
            let config = Self::load(&path)?;
            println!("[CONFIG] Loaded from {}", path);
            return Ok(config);
        }

        let paths = [
            PathBuf::from("config").join("relay.toml"),
            PathBuf::from("..").join("config").join("relay.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: {}", e);
                    }
                }
            }
        }

        println!("[CONFIG] No config file found - using defaults");
        Ok(Self::default())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        if let Some(bind) = lookup("RELAY_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(token) = lookup("INGEST_TOKEN") {
            self.auth.ingest_token = Some(token);
        }
        if let Some(level) = lookup("RELAY_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// The write secret; missing or empty is fatal
    pub fn ingest_token(&self) -> Result<IngestToken, ConfigError> {
        self.auth
            .ingest_token
            .clone()
            .and_then(IngestToken::new)
            .ok_or(ConfigError::MissingIngestToken)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let token = if self.ingest_token().is_ok() { "set" } else { "MISSING" };
        println!("┌─────────────────────────────────────────┐");
        println!("│          RELAY CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Listen: {}", self.listen_addr());
        println!("│ Request Timeout: {}s", self.server.request_timeout_seconds);
        println!("│ Ingest Token: {}", token);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
