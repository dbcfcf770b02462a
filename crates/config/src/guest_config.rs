//! Guest preview limits

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Limits applied while the listener is not signed in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuestConfig {
    /// Seconds into a chapter a guest may listen
    pub time_limit_secs: u64,

    /// Highest chapter index a guest may open (0 = first chapter only)
    pub chapter_limit_index: usize,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 300,
            chapter_limit_index: 0,
        }
    }
}

impl ConfigSection for GuestConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.time_limit_secs, 1, 86_400, "guest.time_limit_secs"),
            Validator::in_range(self.chapter_limit_index, 0, 1_000, "guest.chapter_limit_index"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.time_limit_secs = other.time_limit_secs;
        self.chapter_limit_index = other.chapter_limit_index;
    }

    fn section_name(&self) -> &'static str {
        "guest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preview_is_five_minutes_of_first_chapter() {
        let config = GuestConfig::default();
        assert_eq!(config.time_limit_secs, 300);
        assert_eq!(config.chapter_limit_index, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_time_limit_is_invalid() {
        let config = GuestConfig {
            time_limit_secs: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors[0].field, "guest.time_limit_secs");
    }

    #[test]
    fn test_merge() {
        let mut base = GuestConfig::default();
        base.merge(GuestConfig {
            time_limit_secs: 120,
            chapter_limit_index: 2,
        });
        assert_eq!(base.time_limit_secs, 120);
        assert_eq!(base.chapter_limit_index, 2);
    }
}
