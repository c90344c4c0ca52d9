//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a single TOML file. Missing files are
//! not fatal: the caller gets compiled defaults and a warning.
//!
//! # Config file priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `PCAT_CONFIG` environment variable
//! 3. `<user config dir>/pcat/config.toml`
//! 4. Compiled defaults (no file)
//!
//! # Access token priority
//!
//! 1. Command-line argument
//! 2. `PCAT_ACCESS_TOKEN` environment variable
//! 3. `access_token` in the TOML file

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PCAT_CONFIG";

/// Environment variable carrying the access token
pub const ACCESS_TOKEN_ENV_VAR: &str = "PCAT_ACCESS_TOKEN";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the categorization backend
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Access token forwarded to the backend (optional)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Ingestion tuning (optional)
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Ingestion session tuning
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Capacity of the per-session update channel
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_capacity: usize,

    /// Fail the session when no chunk arrives for this long (unset = wait forever)
    #[serde(default)]
    pub inactivity_timeout_secs: Option<u64>,

    /// TCP connect timeout for backend requests
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_snapshot_capacity() -> usize {
    256
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            access_token: None,
            logging: LoggingConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            snapshot_capacity: default_snapshot_capacity(),
            inactivity_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl IngestConfig {
    /// Inactivity timeout as a `Duration`, if configured
    pub fn inactivity_timeout(&self) -> Option<Duration> {
        self.inactivity_timeout_secs.map(Duration::from_secs)
    }

    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// A missing or unreadable file yields compiled defaults with a warning.
    /// A file that can be read but not parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Config file {} unreadable ({}), using compiled defaults",
                    path.display(),
                    e
                );
                return Ok(Self::default());
            }
        };
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::InvalidInput("server_url must not be empty".to_string()));
        }
        if self.ingest.snapshot_capacity == 0 {
            return Err(Error::InvalidInput(
                "ingest.snapshot_capacity must be at least 1".to_string(),
            ));
        }
        if self.ingest.inactivity_timeout_secs == Some(0) {
            return Err(Error::InvalidInput(
                "ingest.inactivity_timeout_secs must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolves which config file to read
pub struct ConfigResolver {
    app_name: String,
}

impl ConfigResolver {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Resolve the config file path, `None` when no source names one
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config directory
        self.default_config_path().filter(|p| p.exists())
    }

    /// Platform config location, e.g. `~/.config/pcat/config.toml` on Linux
    pub fn default_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(&self.app_name).join("config.toml"))
    }

    /// Resolve and load, falling back to compiled defaults
    pub fn load(&self, cli_arg: Option<&Path>) -> Result<TomlConfig> {
        match self.resolve(cli_arg) {
            Some(path) => TomlConfig::load(&path),
            None => {
                info!("No config file found, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Resolve the access token from CLI → ENV → TOML
///
/// Blank values are ignored. Returns `None` when no source has a token.
pub fn resolve_access_token(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    let cli_token = cli_arg.filter(|t| is_valid_token(t)).map(str::to_string);
    let env_token = std::env::var(ACCESS_TOKEN_ENV_VAR)
        .ok()
        .filter(|t| is_valid_token(t));
    let toml_token = toml_config
        .access_token
        .clone()
        .filter(|t| is_valid_token(t));

    let mut sources = Vec::new();
    if cli_token.is_some() {
        sources.push("command line");
    }
    if env_token.is_some() {
        sources.push("environment");
    }
    if toml_token.is_some() {
        sources.push("TOML");
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Access token found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    cli_token.or(env_token).or(toml_token)
}

fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
