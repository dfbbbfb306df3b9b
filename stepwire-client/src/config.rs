//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via STEPWIRE_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stepwire_protocol::PORT_ENV_VAR;
use thiserror::Error;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV_VAR: &str = "STEPWIRE_CONFIG";
/// Environment variable overriding the connect timeout, in milliseconds.
pub const CONNECT_TIMEOUT_ENV_VAR: &str = "STEPWIRE_CONNECT_TIMEOUT_MS";
/// Environment variable setting a request timeout, in milliseconds (0 = none).
pub const REQUEST_TIMEOUT_ENV_VAR: &str = "STEPWIRE_REQUEST_TIMEOUT_MS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("'{0}' is not a valid port")]
    InvalidPort(String),

    #[error("invalid value '{value}' for {var}")]
    InvalidValue { var: &'static str, value: String },

    #[error("no port configured")]
    MissingPort,

    #[error("failed to read config file {0}: {1}")]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host API port on the loopback interface.
    pub port: u16,
    /// Connect timeout in milliseconds (none or 0 = OS default).
    pub connect_timeout_ms: Option<u64>,
    /// Request timeout in milliseconds (none or 0 = wait indefinitely).
    pub request_timeout_ms: Option<u64>,
    /// Reject responses whose message id differs from the request's.
    pub verify_message_id: bool,
    /// Disable Nagle's algorithm on the socket.
    pub nodelay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: 0,
            connect_timeout_ms: Some(10_000),
            request_timeout_ms: None,
            verify_message_id: true,
            nodelay: true,
        }
    }
}

impl ConnectionConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_verify_message_id(mut self, verify: bool) -> Self {
        self.verify_message_id = verify;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Loopback address of the host.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }

    /// Connect timeout; zero means none.
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    /// Request timeout; zero means none.
    pub fn request_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.request_timeout_ms)
    }

    /// Loads configuration from file (if STEPWIRE_CONFIG is set), then
    /// applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Builds configuration from environment variables only.
    ///
    /// The port variable is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if get(PORT_ENV_VAR).is_none() {
            return Err(ConfigError::MissingEnv(PORT_ENV_VAR));
        }
        let mut config = Self::default();
        config.apply_overrides(get)?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ConnectionConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Fails if no usable port is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::MissingPort);
        }
        Ok(())
    }

    fn apply_overrides<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = get(PORT_ENV_VAR) {
            self.port = parse_port(&port)?;
        }

        if let Some(value) = get(CONNECT_TIMEOUT_ENV_VAR) {
            let ms = parse_millis(CONNECT_TIMEOUT_ENV_VAR, &value)?;
            self.connect_timeout_ms = (ms > 0).then_some(ms);
        }

        if let Some(value) = get(REQUEST_TIMEOUT_ENV_VAR) {
            let ms = parse_millis(REQUEST_TIMEOUT_ENV_VAR, &value)?;
            self.request_timeout_ms = (ms > 0).then_some(ms);
        }

        Ok(())
    }
}

fn non_zero_millis(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|&ms| ms > 0).map(Duration::from_millis)
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(value.to_string())),
    }
}

fn parse_millis(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        })
}
