//! Playback session tuning

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// How the playback session behaves between user commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between engine status reads in milliseconds
    pub status_poll_interval_ms: u64,

    /// Default jump for skip forward/backward in seconds
    pub skip_seconds: u64,

    /// Playback rate applied to a fresh session
    pub default_rate: f32,

    /// Volume applied to a fresh session (0.0 - 1.0)
    pub default_volume: f32,
}

impl SessionConfig {
    pub fn status_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.status_poll_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_poll_interval_ms: 500,
            skip_seconds: 15,
            default_rate: 1.0,
            default_volume: 1.0,
        }
    }
}

impl ConfigSection for SessionConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(
                self.status_poll_interval_ms,
                50,
                5000,
                "session.status_poll_interval_ms",
            ),
            Validator::in_range(self.skip_seconds, 1, 300, "session.skip_seconds"),
            Validator::in_range(self.default_rate, 0.25, 4.0, "session.default_rate"),
            Validator::in_range(self.default_volume, 0.0, 1.0, "session.default_volume"),
        ])
    }

    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn section_name(&self) -> &'static str {
        "session"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_poll_interval() {
        let config = SessionConfig::default();
        assert_eq!(
            config.status_poll_interval(),
            std::time::Duration::from_millis(500)
        );
    }

    #[test]
    fn test_poll_interval_too_fast() {
        let config = SessionConfig {
            status_poll_interval_ms: 10,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors[0].field, "session.status_poll_interval_ms");
    }

    #[test]
    fn test_invalid_rate_and_volume() {
        let config = SessionConfig {
            default_rate: 0.0,
            default_volume: 1.5,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().len(), 2);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SessionConfig = toml::from_str("skip_seconds = 30").unwrap();
        assert_eq!(config.skip_seconds, 30);
        assert_eq!(config.status_poll_interval_ms, 500);
    }
}
