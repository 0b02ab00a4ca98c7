//! Configuration management
//!
//! Settings live in `<dir>/settings.json`:
//! ```json
//! {
//!   "import": {
//!     "duplicateExternalIdPolicy": "tolerant",
//!     "maxRowsLimit": 100000,
//!     "defaultTimezone": "Europe/Berlin",
//!     "profiles": { "coinsmart": { "timezone": "America/Toronto" } }
//!   }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::Label;
use crate::services::{CsvImportOptions, CsvImportSettings, DuplicatePolicy};

pub const SETTINGS_FILE: &str = "settings.json";

pub const DEFAULT_MAX_ROWS_LIMIT: usize = 100_000;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duplicate_external_id_policy: Option<DuplicatePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_rows_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_timezone: Option<String>,
    #[serde(default)]
    profiles: BTreeMap<String, ImportProfile>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Saved CSV options for one wallet service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
}

impl ImportProfile {
    /// Fill options the caller left unset from this profile
    pub fn apply(&self, options: &mut CsvImportOptions) -> Result<()> {
        if options.mapping_id.is_none() {
            options.mapping_id = self.mapping_id.clone();
        }
        if options.timezone.is_none() {
            options.timezone = self.timezone.as_deref().map(parse_timezone).transpose()?;
        }
        if options.currency_id.is_none() {
            options.currency_id = self.currency_id.clone();
        }
        if options.deposit_label.is_none() {
            options.deposit_label = self.deposit_label;
        }
        if options.start_date.is_none() {
            options.start_date = self.start_date;
        }
        Ok(())
    }
}

/// Tallyline configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub duplicate_policy: DuplicatePolicy,
    pub max_rows_limit: usize,
    pub default_timezone: Tz,
    pub profiles: BTreeMap<String, ImportProfile>,
    // Keep the raw settings for preservation when saving
    raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            max_rows_limit: DEFAULT_MAX_ROWS_LIMIT,
            default_timezone: Tz::UTC,
            profiles: BTreeMap::new(),
            raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the settings directory
    ///
    /// Environment overrides (for CI/testing):
    /// 1. `TALLYLINE_DUPLICATE_POLICY` (`strict` / `tolerant`)
    /// 2. `TALLYLINE_MAX_ROWS`
    pub fn load(dir: &Path) -> Result<Self> {
        let settings_path = dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let duplicate_policy = match std::env::var("TALLYLINE_DUPLICATE_POLICY").ok() {
            Some(value) => value
                .parse()
                .context("Invalid TALLYLINE_DUPLICATE_POLICY")?,
            None => raw.import.duplicate_external_id_policy.unwrap_or_default(),
        };

        let max_rows_limit = match std::env::var("TALLYLINE_MAX_ROWS").ok() {
            Some(value) => value
                .trim()
                .parse()
                .context("Invalid TALLYLINE_MAX_ROWS")?,
            None => raw.import.max_rows_limit.unwrap_or(DEFAULT_MAX_ROWS_LIMIT),
        };

        let default_timezone = match raw.import.default_timezone.as_deref() {
            Some(name) => parse_timezone(name)?,
            None => Tz::UTC,
        };

        Ok(Self {
            duplicate_policy,
            max_rows_limit,
            default_timezone,
            profiles: raw.import.profiles.clone(),
            raw_settings: raw,
        })
    }

    /// Save config to the settings directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, dir: &Path) -> Result<()> {
        let settings_path = dir.join(SETTINGS_FILE);

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self.raw_settings.clone())
        } else {
            self.raw_settings.clone()
        };

        settings.import.duplicate_external_id_policy = Some(self.duplicate_policy);
        settings.import.max_rows_limit = Some(self.max_rows_limit);
        settings.import.default_timezone = Some(self.default_timezone.name().to_string());
        settings.import.profiles = self.profiles.clone();

        std::fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Saved profile for a wallet service
    pub fn profile(&self, wallet_service_tag: &str) -> Option<&ImportProfile> {
        self.profiles.get(wallet_service_tag)
    }

    pub fn set_profile(&mut self, wallet_service_tag: impl Into<String>, profile: ImportProfile) {
        self.profiles.insert(wallet_service_tag.into(), profile);
    }

    pub fn csv_settings(&self) -> CsvImportSettings {
        CsvImportSettings {
            duplicate_policy: self.duplicate_policy,
            max_rows_limit: Some(self.max_rows_limit),
            default_timezone: Some(self.default_timezone),
        }
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("Unknown timezone {}: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.max_rows_limit, DEFAULT_MAX_ROWS_LIMIT);
        assert_eq!(config.default_timezone, Tz::UTC);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_load_import_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "import": {
                    "maxRowsLimit": 50,
                    "defaultTimezone": "Europe/Berlin",
                    "profiles": {
                        "coinsmart": { "mappingId": "coinsmart-transactions", "depositLabel": "staking" }
                    }
                }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.max_rows_limit, 50);
        assert_eq!(config.default_timezone, chrono_tz::Europe::Berlin);
        let profile = config.profile("coinsmart").unwrap();
        assert_eq!(profile.mapping_id.as_deref(), Some("coinsmart-transactions"));
        assert_eq!(profile.deposit_label, Some(Label::Reward));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "import": { "defaultTimezone": "Mars/Olympus" } }"#,
        )
        .unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "theme": "dark", "import": { "legacyFlag": true } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.set_profile(
            "coin_metro",
            ImportProfile {
                timezone: Some("Europe/London".into()),
                ..Default::default()
            },
        );
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["import"]["legacyFlag"], true);
        assert_eq!(saved["import"]["profiles"]["coin_metro"]["timezone"], "Europe/London");

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.profile("coin_metro"), config.profile("coin_metro"));
    }

    #[test]
    fn test_profile_fills_unset_options() {
        let profile = ImportProfile {
            mapping_id: Some("generic-amounts".into()),
            timezone: Some("America/Toronto".into()),
            currency_id: Some("EUR".into()),
            ..Default::default()
        };
        let mut options = CsvImportOptions {
            currency_id: Some("USD".into()),
            ..Default::default()
        };
        profile.apply(&mut options).unwrap();
        assert_eq!(options.mapping_id.as_deref(), Some("generic-amounts"));
        assert_eq!(options.timezone, Some(chrono_tz::America::Toronto));
        assert_eq!(options.currency_id.as_deref(), Some("USD"));
    }
}
