// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use config::{Config as ConfigFile, File, Environment};

use crate::models::session::SessionTarget;

pub const DEFAULT_BACKEND_WS_HOST: &str = "localhost:4000";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;
pub const DEFAULT_KEEP_ALIVE_INTERVAL_MS: u64 = 25000;

/// Central configuration for the terminal client
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend `host:port` the terminal socket connects to
    pub backend_ws_host: String,
    /// Use `wss` instead of `ws`
    pub secure: bool,
    pub project_id: String,
    pub sub_path: String,
    pub reconnect_delay_ms: u64,
    pub keep_alive_interval_ms: u64,

    pub auth: AuthConfig,
}

/// Where bearer credentials come from
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let target = SessionTarget::default();
        Self {
            backend_ws_host: DEFAULT_BACKEND_WS_HOST.to_string(),
            secure: false,
            project_id: target.project_id,
            sub_path: target.sub_path,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            keep_alive_interval_ms: DEFAULT_KEEP_ALIVE_INTERVAL_MS,
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__AUTH__TOKEN_FILE
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_plain_env()
            }
        }
    }

    fn from_plain_env() -> Self {
        let defaults = Self::default();

        let backend_ws_host = env::var("BACKEND_WS_HOST")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.backend_ws_host);

        let secure = env::var("BACKEND_WS_SECURE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(defaults.secure);

        let reconnect_delay_ms = env::var("RECONNECT_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.reconnect_delay_ms);

        let keep_alive_interval_ms = env::var("KEEP_ALIVE_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.keep_alive_interval_ms);

        Self {
            backend_ws_host,
            secure,
            project_id: env::var("TERMINAL_PROJECT").unwrap_or(defaults.project_id),
            sub_path: env::var("TERMINAL_PATH").unwrap_or(defaults.sub_path),
            reconnect_delay_ms,
            keep_alive_interval_ms,
            auth: AuthConfig {
                token: env::var("AUTH_TOKEN").ok(),
                token_file: env::var("AUTH_TOKEN_FILE").ok().map(PathBuf::from),
                jwt_secret: env::var("AUTH_JWT_SECRET").ok(),
                user_id: env::var("AUTH_USER_ID").ok(),
            },
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Configured host, or the local default when blank
    pub fn backend_host(&self) -> &str {
        let host = self.backend_ws_host.trim();
        if host.is_empty() { DEFAULT_BACKEND_WS_HOST } else { host }
    }

    pub fn target(&self) -> SessionTarget {
        SessionTarget::new(self.project_id.clone(), self.sub_path.clone())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend_host(), "localhost:4000");
        assert_eq!(config.scheme(), "ws");
        assert_eq!(config.reconnect_delay(), Duration::from_millis(3000));
        assert_eq!(config.keep_alive_interval(), Duration::from_millis(25000));
        assert_eq!(config.target(), SessionTarget::default());
    }

    #[test]
    fn test_blank_host_falls_back() {
        let config = Config {
            backend_ws_host: "  ".to_string(),
            ..Config::default()
        };
        assert_eq!(config.backend_host(), DEFAULT_BACKEND_WS_HOST);
    }

    #[test]
    fn test_secure_scheme() {
        let config = Config {
            secure: true,
            ..Config::default()
        };
        assert_eq!(config.scheme(), "wss");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = ConfigFile::builder()
            .add_source(config::File::from_str(
                "backend_ws_host = \"terminal.example.com:443\"\nsecure = true\n[auth]\ntoken = \"abc\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.backend_host(), "terminal.example.com:443");
        assert!(config.secure);
        assert_eq!(config.auth.token.as_deref(), Some("abc"));
        assert_eq!(config.project_id, "default");
        assert_eq!(config.reconnect_delay_ms, DEFAULT_RECONNECT_DELAY_MS);
    }
}
