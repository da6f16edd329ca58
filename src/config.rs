//! Configuration for the cs800-io front end
//!
//! Loads configuration from a TOML file with the minimal parameters needed
//! to reach one device.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
}

/// Target device configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// IPv4 address the Cryostream 800 broadcasts from and listens on
    pub ip: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log output (stdout, stderr, or file path)
    pub output: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default configuration for a lab-bench device
    ///
    /// Suitable for testing; deployments should carry a TOML file with the
    /// real device address.
    pub fn bench_defaults() -> Self {
        Self {
            device: DeviceConfig {
                ip: "192.168.1.100".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                output: "stdout".to_string(),
            },
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::bench_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::bench_defaults();
        assert_eq!(config.device.ip, "192.168.1.100");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::bench_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[device]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("ip = \"192.168.1.100\""));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[device]
ip = "10.1.2.3"

[logging]
level = "debug"
output = "stderr"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.device.ip, "10.1.2.3");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.output, "stderr");
    }
}
