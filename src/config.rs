//! Registry and server configuration.
//!
//! Loaded from a TOML file. Every section is optional and falls back to its
//! defaults.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Upper bound on the descriptor table size.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Main configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Descriptor table configuration.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Echo server configuration.
    #[serde(default)]
    pub echo: EchoConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacity = self.registry.capacity;
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "registry.capacity ({capacity}) must be in 1..={MAX_CAPACITY}"
            )));
        }

        if self.echo.max_line == 0 {
            return Err(ConfigError::Invalid("echo.max_line must be non-zero".into()));
        }

        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Descriptor table configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Number of descriptor slots. Descriptors at or above this are rejected.
    #[serde(default = "RegistryConfig::default_capacity")]
    pub capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
        }
    }
}

impl RegistryConfig {
    fn default_capacity() -> usize {
        1024
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level or filter directive. `RUST_LOG` takes precedence.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line human readable output
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

/// Echo server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EchoConfig {
    /// Address to listen on.
    #[serde(default = "EchoConfig::default_listen")]
    pub listen: SocketAddr,

    /// Longest line accepted from a client before it is disconnected.
    #[serde(default = "EchoConfig::default_max_line")]
    pub max_line: usize,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            listen: Self::default_listen(),
            max_line: Self::default_max_line(),
        }
    }
}

impl EchoConfig {
    fn default_listen() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 7000))
    }

    fn default_max_line() -> usize {
        512
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.registry.capacity, 1024);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.echo.listen, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(config.echo.max_line, 512);
    }

    #[test]
    fn test_parse_full() {
        let config: Config = r#"
            [registry]
            capacity = 4096

            [logging]
            level = "debug"
            format = "json"

            [echo]
            listen = "0.0.0.0:7001"
            max_line = 1024
        "#
        .parse()
        .unwrap();

        assert_eq!(config.registry.capacity, 4096);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.echo.listen.port(), 7001);
        assert_eq!(config.echo.max_line, 1024);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = "[registry]\ncapacity = 0".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let toml = format!("[registry]\ncapacity = {}", MAX_CAPACITY + 1);
        let err = toml.parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_compact_format() {
        let config: Config = "[logging]\nformat = \"compact\"".parse().unwrap();
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_bad_format_rejected() {
        let err = "[logging]\nformat = \"xml\"".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = "[registry]\nslots = 10".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[registry]\ncapacity = 64").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.registry.capacity, 64);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/fd-registry.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
