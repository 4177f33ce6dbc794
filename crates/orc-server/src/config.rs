//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Result, ServerError};

/// Default host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port
pub const DEFAULT_PORT: u16 = 3001;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Ordered Gemini API keys for rotation
    pub api_keys: Vec<String>,

    /// Directory for the persisted audit and communication logs.
    /// `None` keeps both logs in memory only.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_keys: Vec::new(),
            data_dir: Some(PathBuf::from(".")),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration from the process environment.
    ///
    /// Reads `GEMINI_API_KEYS` (comma-separated, falling back to
    /// `GEMINI_API_KEY`), `HOST`, `PORT` and `ORC_DATA_DIR`. Call
    /// `dotenvy::dotenv()` first if a `.env` file should apply.
    pub fn from_env() -> Self {
        let raw_keys = std::env::var("GEMINI_API_KEYS")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .unwrap_or_default();
        let config = Self::default()
            .with_api_keys(parse_keys(&raw_keys));

        let config = match std::env::var("HOST") {
            Ok(host) if !host.is_empty() => config.with_host(host),
            _ => config,
        };
        let config = match std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            Some(port) => config.with_port(port),
            None => config,
        };
        match std::env::var("ORC_DATA_DIR") {
            Ok(dir) if !dir.is_empty() => config.with_data_dir(PathBuf::from(dir)),
            _ => config,
        }
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the API keys
    pub fn with_api_keys(mut self, keys: Vec<String>) -> Self {
        self.api_keys = keys;
        self
    }

    /// Set the log persistence directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Keep the audit and communication logs in memory only
    pub fn without_persistence(mut self) -> Self {
        self.data_dir = None;
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServerError::Config(format!("invalid bind address {}:{}", self.host, self.port)))
    }
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.api_keys.is_empty());
        assert!(config.data_dir.is_some());
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new()
            .with_host("127.0.0.1")
            .with_port(8080)
            .with_api_keys(vec!["k1".to_string()])
            .without_persistence();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_keys.len(), 1);
        assert!(config.data_dir.is_none());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_parse_keys_drops_blanks() {
        assert_eq!(parse_keys("a, b, ,c,"), vec!["a", "b", "c"]);
        assert!(parse_keys("").is_empty());
        assert!(parse_keys(" , ").is_empty());
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = ServerConfig::new().with_host("not a host");
        assert!(config.socket_addr().is_err());
    }
}
