//! Configuration for the Tarang-IO daemon
//!
//! Loads configuration from a TOML file with the minimal parameters the
//! terminal core needs: which port to open, line geometry, and logging.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub terminal: TerminalConfig,
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Serial port path
    pub port: String,
    /// Baud rate (e.g., 115200)
    pub baud_rate: u32,
}

/// Terminal geometry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TerminalConfig {
    /// Maximum bytes per received line, terminator included.
    /// Must be at least 2; the driver rejects shorter receptions.
    pub line_length: usize,
    /// Outbound overflow ring capacity in bytes, fixed at startup
    /// (the ring is never resized at runtime)
    pub tx_ring_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration for a USB serial console
    ///
    /// Suitable for testing and development. Production deployments
    /// should use a proper TOML configuration file.
    pub fn console_defaults() -> Self {
        Self {
            serial: SerialConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: 115200,
            },
            terminal: TerminalConfig {
                line_length: 80,
                tx_ring_capacity: 64,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::console_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::console_defaults();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.terminal.line_length, 80);
        assert_eq!(config.terminal.tx_ring_capacity, 64);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::console_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[serial]"));
        assert!(toml_string.contains("[terminal]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("baud_rate = 115200"));
        assert!(toml_string.contains("line_length = 80"));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[serial]
port = "/dev/ttyS3"
baud_rate = 9600

[terminal]
line_length = 120
tx_ring_capacity = 128

[logging]
level = "debug"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyS3");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.terminal.line_length, 120);
        assert_eq!(config.terminal.tx_ring_capacity, 128);
        assert_eq!(config.logging.level, "debug");
    }
}
