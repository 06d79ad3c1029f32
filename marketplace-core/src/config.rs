//! Configuration for the marketplace ledger

use crate::fees::Percentage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Marketplace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Market parameters
    pub market: MarketConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "marketplace-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            market: MarketConfig::default(),
            storage: StorageConfig::default(),
            actor: ActorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Market parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Platform fee, whole percent of the sale price
    pub fee_percent: u8,

    /// Height the host clock starts at
    pub genesis_height: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            fee_percent: 3,
            genesis_height: 0,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Persist tables to RocksDB (needs the `persistence` feature)
    pub enabled: bool,

    /// Data directory for RocksDB
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            data_dir: PathBuf::from("./data/marketplace"),
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(fee) = std::env::var("MARKET_FEE_PERCENT") {
            config.market.fee_percent = fee
                .parse()
                .map_err(|e| crate::Error::Config(format!("MARKET_FEE_PERCENT: {}", e)))?;
        }

        if let Ok(data_dir) = std::env::var("MARKET_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(enabled) = std::env::var("MARKET_STORAGE_ENABLED") {
            config.storage.enabled = parse_flag(&enabled);
        }

        if let Ok(json) = std::env::var("MARKET_LOG_JSON") {
            config.logging.json = parse_flag(&json);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> crate::Result<()> {
        if Percentage::from_percent(self.market.fee_percent).is_none() {
            return Err(crate::Error::Config(format!(
                "fee_percent must be at most 100, got {}",
                self.market.fee_percent
            )));
        }

        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "mailbox_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Validated platform fee
    pub fn fee(&self) -> crate::Result<Percentage> {
        Percentage::from_percent(self.market.fee_percent).ok_or_else(|| {
            crate::Error::Config(format!(
                "fee_percent must be at most 100, got {}",
                self.market.fee_percent
            ))
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "marketplace-core");
        assert_eq!(config.market.fee_percent, 3);
        assert!(!config.storage.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [market]
            fee_percent = 5

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.market.fee_percent, 5);
        assert_eq!(config.market.genesis_height, 0);
        assert!(config.logging.json);
        assert_eq!(config.actor.mailbox_capacity, 1000);
    }

    #[test]
    fn test_fee_above_hundred_rejected() {
        let result = Config::from_toml("[market]\nfee_percent = 150\n");
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_zero_mailbox_rejected() {
        let mut config = Config::default();
        config.actor.mailbox_capacity = 0;
        assert!(config.validate().is_err());
    }

    // Single test so the process environment is not mutated concurrently
    #[test]
    fn test_from_env() {
        std::env::set_var("MARKET_FEE_PERCENT", "7");
        std::env::set_var("MARKET_DATA_DIR", "/tmp/market-env");
        std::env::set_var("MARKET_STORAGE_ENABLED", "true");
        std::env::set_var("MARKET_LOG_JSON", "1");

        let config = Config::from_env().unwrap();
        assert_eq!(config.market.fee_percent, 7);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/market-env"));
        assert!(config.storage.enabled);
        assert!(config.logging.json);

        std::env::set_var("MARKET_FEE_PERCENT", "seven");
        assert!(matches!(Config::from_env(), Err(crate::Error::Config(_))));

        std::env::set_var("MARKET_FEE_PERCENT", "101");
        assert!(matches!(Config::from_env(), Err(crate::Error::Config(_))));

        for var in [
            "MARKET_FEE_PERCENT",
            "MARKET_DATA_DIR",
            "MARKET_STORAGE_ENABLED",
            "MARKET_LOG_JSON",
        ] {
            std::env::remove_var(var);
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.market.fee_percent, 3);
        assert!(!config.storage.enabled);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
