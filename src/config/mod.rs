//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Port used when neither PORT nor SERVER_ADDR is set
const DEFAULT_PORT: u16 = 3000;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,

    /// Directory holding the client bundle
    pub static_dir: PathBuf,
    /// Path accepting WebSocket upgrades
    pub ws_path: String,
    /// Allowed client origins for CORS (empty = any)
    pub client_origins: Vec<String>,
    /// Max inbound updates per second per connection (None = unlimited)
    pub update_rate_limit: Option<u32>,
}

/// Output format for log lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins so hosting platforms can assign one
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| format!("0.0.0.0:{}", DEFAULT_PORT)),
        };

        let ws_path = lookup("WS_PATH").unwrap_or_else(|| "/".to_string());
        if !ws_path.starts_with('/') || ws_path == "/health" {
            return Err(ConfigError::InvalidWsPath(ws_path));
        }

        let update_rate_limit = match lookup("UPDATE_RATE_LIMIT") {
            Some(raw) => {
                let limit: u32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber("UPDATE_RATE_LIMIT", raw.clone()))?;
                (limit > 0).then_some(limit)
            }
            None => None,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr))?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            ws_path,
            client_origins,
            update_rate_limit,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("WS_PATH must start with '/' and not be /health: {0}")]
    InvalidWsPath(String),

    #[error("Invalid number for {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error("LOG_FORMAT must be 'text' or 'json': {0}")]
    InvalidLogFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.ws_path, "/");
        assert!(config.client_origins.is_empty());
        assert!(config.update_rate_limit.is_none());
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1234")]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:9000".parse().unwrap());

        let config = load(&[("SERVER_ADDR", "127.0.0.1:1234")]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:1234".parse().unwrap());
    }

    #[test]
    fn origins_and_rate_limit() {
        let config = load(&[
            ("CLIENT_ORIGIN", "https://a.example, https://b.example,"),
            ("UPDATE_RATE_LIMIT", "60"),
        ])
        .unwrap();
        assert_eq!(
            config.client_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.update_rate_limit, Some(60));

        let config = load(&[("UPDATE_RATE_LIMIT", "0")]).unwrap();
        assert!(config.update_rate_limit.is_none());
    }

    #[test]
    fn json_log_format() {
        let config = load(&[("LOG_FORMAT", "json")]).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        let config = load(&[("LOG_FORMAT", "text")]).unwrap();
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("PORT", "not-a-port")]),
            Err(ConfigError::InvalidAddress(_))
        ));
        assert!(matches!(
            load(&[("WS_PATH", "ws")]),
            Err(ConfigError::InvalidWsPath(_))
        ));
        assert!(matches!(
            load(&[("WS_PATH", "/health")]),
            Err(ConfigError::InvalidWsPath(_))
        ));
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidLogFormat(_))
        ));
        assert!(matches!(
            load(&[("UPDATE_RATE_LIMIT", "lots")]),
            Err(ConfigError::InvalidNumber("UPDATE_RATE_LIMIT", _))
        ));
    }
}
