//! Registry connection settings.
//!
//! The three inputs arrive as strings from the hosting environment. An empty
//! string means "unset" and is replaced by the documented default.

use thiserror::Error;

/// Default registry host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default registry port.
pub const DEFAULT_PORT: u16 = 6379;

/// Default name of the set holding valid tokens.
pub const DEFAULT_SET_KEY: &str = "nginx_tokens:bearer";

/// Errors from resolving registry settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A non-empty port that is not a valid TCP port number.
    #[error("invalid registry port: {0:?}")]
    InvalidPort(String),
}

/// Resolved registry settings, immutable for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    pub host: String,
    pub port: u16,
    pub set_key: String,
}

impl RegistryConfig {
    /// Resolve raw inputs, substituting the default for every empty value.
    pub fn resolve(host: &str, port: &str, set_key: &str) -> Result<Self, ConfigError> {
        let port = if port.is_empty() {
            DEFAULT_PORT
        } else {
            port.parse()
                .map_err(|_| ConfigError::InvalidPort(port.to_string()))?
        };

        Ok(Self {
            host: or_default(host, DEFAULT_HOST),
            port,
            set_key: or_default(set_key, DEFAULT_SET_KEY),
        })
    }

    /// `host:port`, for log lines and error messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            set_key: DEFAULT_SET_KEY.into(),
        }
    }
}

fn or_default(value: &str, default: &str) -> String {
    let value = if value.is_empty() { default } else { value };
    value.to_string()
}
