//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

/// Environment variable prefix for overrides, e.g. `CHAPTERLINE_GUEST_TIME_LIMIT_SECS`
const ENV_PREFIX: &str = "CHAPTERLINE";

pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager rooted at the platform config directory
    ///
    /// - Linux: `~/.config/chapterline/`
    /// - macOS: `~/Library/Application Support/chapterline/`
    /// - Windows: `%APPDATA%\chapterline\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = ProjectDirs::from("", "", "chapterline")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })?;
        Ok(Self::with_directory(config_dir))
    }

    pub fn with_directory(config_dir: PathBuf) -> Self {
        let persistence = ConfigPersistence::new(config_dir.join(CONFIG_FILE));
        Self {
            persistence,
            config_dir,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Path {
        self.persistence.config_path()
    }

    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Writes a default config file unless one exists
    ///
    /// Returns `Ok(true)` when a file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.save(&Config::default())?;
        Ok(true)
    }

    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the stored file, returning human-readable problems
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the file and applies `CHAPTERLINE_*` environment overrides
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

    if let Some(v) = var("SESSION_STATUS_POLL_INTERVAL_MS").and_then(|s| s.parse().ok()) {
        config.session.status_poll_interval_ms = v;
    }
    if let Some(v) = var("SESSION_SKIP_SECONDS").and_then(|s| s.parse().ok()) {
        config.session.skip_seconds = v;
    }
    if let Some(v) = var("SESSION_DEFAULT_RATE").and_then(|s| s.parse().ok()) {
        config.session.default_rate = v;
    }
    if let Some(v) = var("SESSION_DEFAULT_VOLUME").and_then(|s| s.parse().ok()) {
        config.session.default_volume = v;
    }
    if let Some(v) = var("GUEST_TIME_LIMIT_SECS").and_then(|s| s.parse().ok()) {
        config.guest.time_limit_secs = v;
    }
    if let Some(v) = var("GUEST_CHAPTER_LIMIT_INDEX").and_then(|s| s.parse().ok()) {
        config.guest.chapter_limit_index = v;
    }
}
