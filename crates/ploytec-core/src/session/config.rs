//! Session configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Configuration for a control session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bundle identifier of the driver extension.
    pub dext_identifier: String,
    /// Connection retry interval while disconnected, in milliseconds.
    pub retry_interval_ms: u64,
    /// Statistics polling interval while connected, in milliseconds.
    pub stats_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dext_identifier: "sc.hackerman.ploytecdriver".to_string(),
            retry_interval_ms: 5000,
            stats_interval_ms: 1000,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.dext_identifier, "sc.hackerman.ploytecdriver");
        assert_eq!(config.retry_interval_ms, 5000);
        assert_eq!(config.stats_interval_ms, 1000);
    }

    #[test]
    fn test_parse_toml() {
        let config: SessionConfig = toml::from_str(
            r#"
            dext_identifier = "sc.hackerman.xonedb4driver"
            retry_interval_ms = 5000
            stats_interval_ms = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.dext_identifier, "sc.hackerman.xonedb4driver");
        assert_eq!(config.stats_interval_ms, 100);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SessionConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: SessionConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.dext_identifier, config.dext_identifier);
        assert_eq!(parsed.retry_interval_ms, config.retry_interval_ms);
    }
}
