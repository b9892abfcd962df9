use anyhow::{bail, Context, Result};
use parcel_economics::{compute_fees, Amount, Currency, FeeRate, GovernanceConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::logging::{LogConfig, LogFormat, LogLevel};

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParcelConfig {
    /// Escrow defaults for accounts opened without explicit rates
    #[serde(default)]
    pub escrow: EscrowSettings,

    /// Voting window and tally thresholds
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowSettings {
    /// Settlement currency
    #[serde(default)]
    pub currency: Currency,

    /// Management fee in basis points (200 = 2%)
    #[serde(default = "default_management_fee")]
    pub management_fee_bps: FeeRate,

    /// Platform fee in basis points (50 = 0.5%)
    #[serde(default = "default_platform_fee")]
    pub platform_fee_bps: FeeRate,
}

fn default_management_fee() -> FeeRate {
    FeeRate::from_bps(200).unwrap_or_default()
}

fn default_platform_fee() -> FeeRate {
    FeeRate::from_bps(50).unwrap_or_default()
}

impl Default for EscrowSettings {
    fn default() -> Self {
        Self {
            currency: Currency::Usd,
            management_fee_bps: default_management_fee(),
            platform_fee_bps: default_platform_fee(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    #[serde(default)]
    pub level: LogLevel,

    /// pretty, json or compact
    #[serde(default)]
    pub format: LogFormat,

    /// Print the module path of each event
    #[serde(default = "default_true")]
    pub target: bool,

    /// Per-module levels, e.g. `parcel_economics = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, LogLevel>,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            target: true,
            modules: BTreeMap::new(),
        }
    }
}

impl ParcelConfig {
    /// Load from `path`, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ParcelConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.governance.validate()?;
        compute_fees(
            Amount::zero(),
            self.escrow.management_fee_bps,
            self.escrow.platform_fee_bps,
        )
        .context("Invalid [escrow] fee rates")?;

        for module in self.logging.modules.keys() {
            if module.is_empty() || module.contains(|c: char| c == ',' || c == '=' || c.is_whitespace()) {
                bail!("Invalid module name in [logging.modules]: {:?}", module);
            }
        }
        Ok(())
    }

    /// Logging setup from the [logging] section, overridden by the environment
    pub fn log_config(&self) -> Result<LogConfig> {
        let mut log = LogConfig {
            level: self.logging.level,
            format: self.logging.format,
            module_levels: self
                .logging
                .modules
                .iter()
                .map(|(module, level)| (module.clone(), *level))
                .collect(),
            include_target: self.logging.target,
            ..LogConfig::default()
        };
        log.apply_env().context("Invalid logging environment")?;
        Ok(log)
    }
}

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    PathBuf::from("parcel.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = ParcelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.escrow.management_fee_bps.bps(), 200);
        assert_eq!(config.escrow.platform_fee_bps.bps(), 50);
        assert_eq!(config.governance.tally.quorum_percentage, 25);
        assert_eq!(config.governance.tally.passing_percentage, 50);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("parcel.toml");

        let mut config = ParcelConfig::default();
        config.escrow.currency = Currency::Eur;
        config.governance.voting_period_days = 3;
        config.save(&path).unwrap();

        let loaded = ParcelConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcel.toml");
        std::fs::write(&path, "[governance]\nvoting_period_days = 14\nquorum_percentage = 30\npassing_percentage = 60\n").unwrap();

        let config = ParcelConfig::load(Some(&path)).unwrap();
        assert_eq!(config.governance.voting_period_days, 14);
        assert_eq!(config.governance.tally.quorum_percentage, 30);
        assert_eq!(config.escrow, EscrowSettings::default());
    }

    #[test]
    fn test_single_key_sections_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcel.toml");

        std::fs::write(&path, "[governance]\nvoting_period_days = 14\n").unwrap();
        let config = ParcelConfig::load(Some(&path)).unwrap();
        assert_eq!(config.governance.voting_period_days, 14);
        assert_eq!(config.governance.tally.quorum_percentage, 25);
        assert_eq!(config.governance.tally.passing_percentage, 50);

        std::fs::write(&path, "[governance]\nquorum_percentage = 40\n").unwrap();
        let config = ParcelConfig::load(Some(&path)).unwrap();
        assert_eq!(config.governance.voting_period_days, 7);
        assert_eq!(config.governance.tally.quorum_percentage, 40);
    }

    #[test]
    fn test_logging_section_reaches_subscriber_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcel.toml");
        std::fs::write(
            &path,
            "[logging]\nlevel = \"warn\"\ntarget = false\n\n[logging.modules]\nparcel_economics = \"debug\"\n",
        )
        .unwrap();

        let config = ParcelConfig::load(Some(&path)).unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);

        let log = config.log_config().unwrap();
        assert_eq!(log.level, LogLevel::Warn);
        assert!(!log.include_target);
        assert_eq!(log.module_levels, vec![("parcel_economics".to_string(), LogLevel::Debug)]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcel.toml");

        std::fs::write(&path, "[escrow]\nmanagement_fee_bps = 20000\n").unwrap();
        assert!(ParcelConfig::load(Some(&path)).is_err());

        std::fs::write(&path, "[escrow]\nmanagement_fee_bps = 6000\nplatform_fee_bps = 6000\n").unwrap();
        assert!(ParcelConfig::load(Some(&path)).is_err());

        std::fs::write(&path, "[governance]\nvoting_period_days = 7\nquorum_percentage = 120\npassing_percentage = 50\n").unwrap();
        assert!(ParcelConfig::load(Some(&path)).is_err());

        std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(ParcelConfig::load(Some(&path)).is_err());

        std::fs::write(&path, "[logging]\nformat = \"jsn\"\n").unwrap();
        assert!(ParcelConfig::load(Some(&path)).is_err());

        std::fs::write(&path, "[logging.modules]\n\"a,b\" = \"debug\"\n").unwrap();
        assert!(ParcelConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(ParcelConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
        assert!(ParcelConfig::load(None).is_ok());
    }
}
