//! Guest preview limits
//!
//! A guest may listen to the first `time_limit_seconds` of a chapter and may
//! open chapters up to `chapter_limit_index`. The guard only decides; the
//! session pauses playback and raises the notice.

use chapterline_config::GuestConfig;
use std::fmt;

/// Which preview limit stopped playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestLimitReason {
    Time,
    Chapter,
}

impl fmt::Display for GuestLimitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Chapter => write!(f, "chapter"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuestPolicy {
    /// Seconds into a chapter a guest may listen
    pub time_limit_seconds: f64,
    /// Highest chapter index a guest may open
    pub chapter_limit_index: usize,
}

impl Default for GuestPolicy {
    fn default() -> Self {
        Self {
            time_limit_seconds: 300.0,
            chapter_limit_index: 0,
        }
    }
}

impl From<&GuestConfig> for GuestPolicy {
    fn from(config: &GuestConfig) -> Self {
        Self {
            time_limit_seconds: config.time_limit_secs as f64,
            chapter_limit_index: config.chapter_limit_index,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GuestPolicyGuard {
    policy: GuestPolicy,
}

impl GuestPolicyGuard {
    pub fn new(policy: GuestPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GuestPolicy {
        &self.policy
    }

    /// Checks the position reported by a status tick
    pub fn check_time(
        &self,
        is_guest: bool,
        is_playing: bool,
        position: f64,
    ) -> Option<GuestLimitReason> {
        (is_guest && is_playing && position > self.policy.time_limit_seconds)
            .then_some(GuestLimitReason::Time)
    }

    /// Checks a chapter the listener is about to open
    pub fn check_chapter(&self, is_guest: bool, target_index: usize) -> Option<GuestLimitReason> {
        (is_guest && target_index > self.policy.chapter_limit_index)
            .then_some(GuestLimitReason::Chapter)
    }
}
