//! Configuration for the swap router

use crate::{
    fee::{BPS_DENOMINATOR, DEFAULT_FEE_BPS, DEFAULT_MAX_FEE_BPS},
    Error, Result,
};
use ledger_core::Address;
use serde::{Deserialize, Serialize};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ledger host configuration
    pub ledger: ledger_core::Config,

    /// Router deployment parameters
    pub router: RouterConfig,

    /// Address to serve `/metrics` on; not served when unset
    pub metrics_listen_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "swap-router".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: ledger_core::Config::default(),
            router: RouterConfig::default(),
            metrics_listen_addr: None,
        }
    }
}

/// Router deployment parameters (immutable after deployment except the fee)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Address the router is deployed at
    pub address: Address,

    /// Treasury principal; must be set
    pub treasury: Address,

    /// Asset id standing for the native asset in requests
    pub native_asset: Address,

    /// Initial fee rate (bps)
    pub fee_bps: u16,

    /// Fee ceiling (bps)
    pub max_fee_bps: u16,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            address: Address::from_label("swap-router"),
            treasury: Address::ZERO,
            native_asset: Address::ZERO,
            fee_bps: DEFAULT_FEE_BPS,
            max_fee_bps: DEFAULT_MAX_FEE_BPS,
        }
    }
}

impl RouterConfig {
    /// Check `fee_bps <= max_fee_bps <= 10_000` and a non-zero treasury
    pub fn validate(&self) -> Result<()> {
        if self.treasury.is_zero() {
            return Err(Error::Config("treasury address is not set".to_string()));
        }
        if self.max_fee_bps > BPS_DENOMINATOR {
            return Err(Error::Config(format!(
                "max_fee_bps {} exceeds {}",
                self.max_fee_bps, BPS_DENOMINATOR
            )));
        }
        if self.fee_bps > self.max_fee_bps {
            return Err(Error::Config(format!(
                "fee_bps {} exceeds max_fee_bps {}",
                self.fee_bps, self.max_fee_bps
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config {
            ledger: ledger_core::Config::from_env()?,
            ..Config::default()
        };

        if let Ok(address) = std::env::var("ROUTER_ADDRESS") {
            config.router.address = parse_address("ROUTER_ADDRESS", &address)?;
        }

        if let Ok(treasury) = std::env::var("ROUTER_TREASURY") {
            config.router.treasury = parse_address("ROUTER_TREASURY", &treasury)?;
        }

        if let Ok(native) = std::env::var("ROUTER_NATIVE_ASSET") {
            config.router.native_asset = parse_address("ROUTER_NATIVE_ASSET", &native)?;
        }

        if let Ok(fee) = std::env::var("ROUTER_FEE_BPS") {
            config.router.fee_bps = fee
                .parse()
                .map_err(|e| Error::Config(format!("ROUTER_FEE_BPS: {}", e)))?;
        }

        if let Ok(max_fee) = std::env::var("ROUTER_MAX_FEE_BPS") {
            config.router.max_fee_bps = max_fee
                .parse()
                .map_err(|e| Error::Config(format!("ROUTER_MAX_FEE_BPS: {}", e)))?;
        }

        if let Ok(addr) = std::env::var("ROUTER_METRICS_ADDR") {
            config.metrics_listen_addr = Some(addr);
        }

        Ok(config)
    }
}

fn parse_address(var: &str, value: &str) -> Result<Address> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", var, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_router_config_needs_treasury() {
        let config = RouterConfig::default();
        assert_eq!(config.fee_bps, 30);
        assert_eq!(config.max_fee_bps, 50);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RouterConfig {
            treasury: Address::from_label("treasury"),
            ..RouterConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_fee_bounds() {
        let base = RouterConfig {
            treasury: Address::from_label("treasury"),
            ..RouterConfig::default()
        };
        assert!(RouterConfig { fee_bps: 51, ..base.clone() }.validate().is_err());
        assert!(RouterConfig { fee_bps: 0, max_fee_bps: 10_001, ..base.clone() }.validate().is_err());
        assert!(RouterConfig { fee_bps: 50, ..base }.validate().is_ok());
    }

    #[test]
    fn test_from_file_nested_sections() {
        let treasury = Address::from_label("treasury");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "service_name = \"router-test\"").unwrap();
        writeln!(file, "metrics_listen_addr = \"127.0.0.1:9092\"").unwrap();
        writeln!(file, "[router]").unwrap();
        writeln!(file, "treasury = \"{}\"", treasury).unwrap();
        writeln!(file, "fee_bps = 10").unwrap();
        writeln!(file, "[ledger]").unwrap();
        writeln!(file, "max_call_depth = 16").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.service_name, "router-test");
        assert_eq!(config.metrics_listen_addr.as_deref(), Some("127.0.0.1:9092"));
        assert_eq!(config.router.treasury, treasury);
        assert_eq!(config.router.fee_bps, 10);
        assert_eq!(config.router.max_fee_bps, 50);
        assert_eq!(config.ledger.max_call_depth, 16);
        assert!(config.router.validate().is_ok());
    }

    #[test]
    fn test_metrics_not_served_by_default() {
        assert!(Config::default().metrics_listen_addr.is_none());
    }

    #[test]
    fn test_from_file_rejects_bad_address() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[router]").unwrap();
        writeln!(file, "treasury = \"not-an-address\"").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(Error::Config(_))));
    }
}
