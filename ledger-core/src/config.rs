//! Configuration for the ledger host

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for state snapshots
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Asset id carried as call value
    pub native_asset: Address,

    /// Maximum nested call depth
    pub max_call_depth: usize,

    /// Host actor mailbox size
    pub mailbox_size: usize,

    /// Events kept in the committed log (0 keeps all)
    pub log_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            service_name: "ledger-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            native_asset: Address::ZERO,
            max_call_depth: 64,
            mailbox_size: 1024,
            log_retention: 10_000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(native) = std::env::var("LEDGER_NATIVE_ASSET") {
            config.native_asset = native.parse()?;
        }

        if let Ok(depth) = std::env::var("LEDGER_MAX_CALL_DEPTH") {
            config.max_call_depth = depth
                .parse()
                .map_err(|e| crate::Error::Config(format!("LEDGER_MAX_CALL_DEPTH: {}", e)))?;
        }

        if let Ok(retention) = std::env::var("LEDGER_LOG_RETENTION") {
            config.log_retention = retention
                .parse()
                .map_err(|e| crate::Error::Config(format!("LEDGER_LOG_RETENTION: {}", e)))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "ledger-core");
        assert_eq!(config.native_asset, Address::ZERO);
        assert_eq!(config.max_call_depth, 64);
        assert_eq!(config.log_retention, 10_000);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let native = Address::from_label("ETH");
        writeln!(file, "native_asset = \"{}\"", native).unwrap();
        writeln!(file, "max_call_depth = 8").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.native_asset, native);
        assert_eq!(config.max_call_depth, 8);
        assert_eq!(config.service_name, "ledger-core");
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "native_asset = \"0x12\"").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(crate::Error::Config(_))
        ));
    }
}
