//! Configuration file
//!
//! ```json
//! { "data_dir": "./registry-data",
//!   "http": { "host": "127.0.0.1", "port": 4943, "max_body_bytes": 65536 } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::http_server::HttpServerConfig;
use crate::registry::REGIONS_DIR;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// HTTP adapter settings (optional)
    #[serde(default)]
    pub http: HttpServerConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.http.port == 0 {
            return Err(CliError::config_error("http.port must be > 0"));
        }

        if self.http.max_body_bytes == 0 {
            return Err(CliError::config_error("http.max_body_bytes must be > 0"));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Directory holding the region logs
    pub fn regions_path(&self) -> PathBuf {
        self.data_path().join(REGIONS_DIR)
    }

    pub fn is_initialized(&self) -> bool {
        self.regions_path().is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_http_defaults() {
        let config = Config::from_json(r#"{"data_dir": "/tmp/reg"}"#).unwrap();
        assert_eq!(config.data_path(), Path::new("/tmp/reg"));
        assert_eq!(config.http, HttpServerConfig::default());
        assert_eq!(config.regions_path(), Path::new("/tmp/reg").join("regions"));
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(
            r#"{"data_dir": "d", "http": {"host": "0.0.0.0", "port": 8000, "max_body_bytes": 1024}}"#,
        )
        .unwrap();
        assert_eq!(config.http.socket_addr(), "0.0.0.0:8000");
        assert_eq!(config.http.max_body_bytes, 1024);
    }

    #[test]
    fn test_validation_failures() {
        for bad in [
            r#"{}"#,
            r#"{"data_dir": "  "}"#,
            r#"{"data_dir": "d", "http": {"port": 0}}"#,
            r#"{"data_dir": "d", "http": {"max_body_bytes": 0}}"#,
            r#"not json"#,
        ] {
            let err = Config::from_json(bad).unwrap_err();
            assert_eq!(err.code_str(), "REG_CLI_CONFIG_ERROR", "input: {}", bad);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/docregistry.json")).unwrap_err();
        assert_eq!(err.code_str(), "REG_CLI_CONFIG_ERROR");
    }
}
