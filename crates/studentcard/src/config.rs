//! Configuration management for studentcard.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then environment variables.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::card::{CardOptions, CardTemplate, DEFAULT_QR_SIZE};
use crate::error::{Error, Result};
use crate::projection::ErrorCorrection;
use crate::store::DEFAULT_SLOT_KEY;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "studentcard";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "cards.db";

/// Prefix of environment overrides. Nested keys are separated by `__`,
/// e.g. `STUDENTCARD_STORAGE__SLOT_KEY`.
pub const ENV_PREFIX: &str = "STUDENTCARD_";

/// Largest QR edge accepted, in pixels.
const MAX_QR_SIZE: u32 = 4096;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `STUDENTCARD_`)
/// 2. TOML config file at `~/.config/studentcard/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// QR symbol configuration.
    pub qr: QrConfig,
    /// Card layout configuration.
    pub card: CardConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/studentcard/cards.db`
    pub database_path: Option<PathBuf>,
    /// Slot the record is saved under.
    pub slot_key: String,
}

/// QR-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Error-correction level.
    pub error_correction: ErrorCorrection,
    /// Symbol edge in pixels.
    pub size: u32,
}

/// Card-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Color scheme.
    pub template: CardTemplate,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            slot_key: DEFAULT_SLOT_KEY.to_string(),
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::default(),
            size: DEFAULT_QR_SIZE,
        }
    }
}

/// Pattern a slot key must match.
///
/// # Panics
///
/// Panics if the built-in pattern fails to compile.
fn slot_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]*$").expect("Invalid slot key pattern"))
}

impl Config {
    /// Load configuration from defaults, the config file (`config_path` or
    /// the default location) and `STUDENTCARD_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a single TOML file over the defaults, without
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, does not parse, or holds
    /// invalid values.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigValidation {
                message: format!("config file not found: {}", path.display()),
            });
        }
        let config: Config = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !slot_key_regex().is_match(&self.storage.slot_key) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "slot_key '{}' must start with a letter or digit and contain only letters, digits, '_', '.', ':' or '-'",
                    self.storage.slot_key
                ),
            });
        }

        if self.qr.size == 0 || self.qr.size > MAX_QR_SIZE {
            return Err(Error::ConfigValidation {
                message: format!(
                    "qr.size must be between 1 and {MAX_QR_SIZE}, got {}",
                    self.qr.size
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Card layout options.
    #[must_use]
    pub fn card_options(&self) -> CardOptions {
        CardOptions {
            template: self.card.template,
            qr_size: self.qr.size,
            error_correction: self.qr.error_correction,
        }
    }
}
