//! Chapterline configuration
//!
//! Configuration is a TOML file with one table per section. Every section
//! implements [`ConfigSection`], so it validates and merges itself, and every
//! field has a default, so a partial file is always loadable.
//!
//! # Example
//!
//! ```rust,no_run
//! use chapterline_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("config directory");
//! let config = manager.load_or_default();
//! println!("Guest preview: {}s", config.guest.time_limit_secs);
//! ```

mod error;
mod guest_config;
mod manager;
mod persistence;
mod session_config;
mod validation;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use guest_config::GuestConfig;
pub use manager::ConfigManager;
pub use session_config::SessionConfig;
pub use validation::{ConfigSection, Validator};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub session: SessionConfig,
    pub guest: GuestConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates every section, returning all errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.session.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.guest.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges `other` into this config; values from `other` win
    ///
    /// Override chain: defaults < file < env vars < CLI args
    pub fn merge(&mut self, other: Config) {
        self.session.merge(other.session);
        self.guest.merge(other.guest);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            session: SessionConfig::default(),
            guest: GuestConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_version_is_set() {
        assert_eq!(Config::default().version, CONFIG_VERSION);
    }

    #[test]
    fn test_validate_collects_across_sections() {
        let mut config = Config::default();
        config.session.skip_seconds = 0;
        config.guest.time_limit_secs = 0;
        assert_eq!(config.validate().unwrap_err().len(), 2);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut override_config = Config::default();
        override_config.guest.time_limit_secs = 60;

        base.merge(override_config);
        assert_eq!(base.guest.time_limit_secs, 60);
    }

    #[test]
    fn test_toml_sections() {
        let text = r#"
            [session]
            skip_seconds = 30

            [guest]
            chapter_limit_index = 1
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.session.skip_seconds, 30);
        assert_eq!(config.guest.chapter_limit_index, 1);
        assert_eq!(config.guest.time_limit_secs, 300);
    }
}
