//! Configuration management for solochain

use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
    #[serde(default)]
    pub mining: MiningConfig,
}

#[derive(Debug, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
}

#[derive(Debug, Deserialize)]
pub struct GenesisConfig {
    #[serde(default = "default_address")]
    pub funder_address: String,
    #[serde(default = "default_fund_amount")]
    pub fund_amount: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MiningConfig {
    #[serde(default = "default_address")]
    pub beneficiary_address: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            difficulty: default_difficulty(),
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            funder_address: default_address(),
            fund_amount: default_fund_amount(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            beneficiary_address: default_address(),
        }
    }
}

fn default_ledger_path() -> String {
    "./data/ledger.json".to_string()
}

fn default_difficulty() -> u32 {
    2
}

fn default_address() -> String {
    "0000000000000000000000000000000000000000".to_string()
}

fn default_fund_amount() -> f64 {
    1_000_000.0
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string("config.toml").unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        // Provide sane defaults when config.toml is absent
        Config {
            ledger: LedgerConfig::default(),
            genesis: GenesisConfig::default(),
            mining: MiningConfig::default(),
        }
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.ledger.path.is_empty() {
        return Err("ledger.path must be set in config.toml".into());
    }

    if config.ledger.difficulty == 0 {
        return Err("ledger.difficulty must be at least 1".into());
    }

    if config.genesis.funder_address.is_empty() {
        return Err("genesis.funder_address must be set in config.toml".into());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ledger.path, "./data/ledger.json");
        assert_eq!(config.ledger.difficulty, 2);
        assert_eq!(config.genesis.fund_amount, 1_000_000.0);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            "[ledger]\ndifficulty = 3\n\n[genesis]\nfunder_address = \"abc123\"\n",
        )
        .unwrap();
        assert_eq!(config.ledger.difficulty, 3);
        assert_eq!(config.ledger.path, "./data/ledger.json");
        assert_eq!(config.genesis.funder_address, "abc123");
        assert_eq!(config.genesis.fund_amount, 1_000_000.0);
    }
}
