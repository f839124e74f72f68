//! Configuration loader and validator for the sync agent.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub api: Api,
    pub probe: Probe,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

/// Reachability probe the daemon shell uses to feed connectivity signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Probe {
    pub path: String,
    pub interval_ms: u64,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Base URL normalized with a trailing slash so relative paths join
    /// underneath it rather than replacing the last segment.
    pub fn api_base(&self) -> String {
        let mut base = self.api.base_url.trim_end_matches('/').to_string();
        base.push('/');
        base
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if !cfg.api.base_url.starts_with("http://") && !cfg.api.base_url.starts_with("https://") {
        return Err(ConfigError::Invalid("api.base_url must be an http(s) URL"));
    }
    if cfg.api.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("api.timeout_seconds must be > 0"));
    }

    if !cfg.probe.path.starts_with('/') {
        return Err(ConfigError::Invalid("probe.path must start with '/'"));
    }
    if cfg.probe.interval_ms == 0 {
        return Err(ConfigError::Invalid("probe.interval_ms must be > 0"));
    }

    Ok(())
}

/// Example YAML configuration, kept in sync with the schema above.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

api:
  base_url: "https://api.logbook.example.com"
  token: "YOUR_API_TOKEN"
  timeout_seconds: 8

probe:
  path: "/api/health/"
  interval_ms: 15000
"#
}
