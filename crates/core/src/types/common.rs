//! Common types and utilities shared across domain models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock timestamp in milliseconds since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp for the current moment
    ///
    /// Falls back to timestamp 0 if the system clock reads before the epoch.
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_else(|_| std::time::Duration::from_secs(0))
                .as_millis() as i64,
        )
    }

    /// Creates a timestamp from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp shifted forward by `offset`
    pub fn after(&self, offset: std::time::Duration) -> Self {
        Self(self.0.saturating_add(offset.as_millis() as i64))
    }

    /// Milliseconds from `self` until `later`, zero if `later` is in the past
    pub fn millis_until(&self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0).max(0) as u64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media duration in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Duration(u64);

impl Duration {
    pub const ZERO: Self = Self(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Self(seconds.saturating_mul(1000))
    }

    /// Creates a duration from fractional seconds; negative or NaN input yields zero
    pub fn from_secs_f64(seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            Self((seconds * 1000.0).round() as u64)
        } else {
            Self::ZERO
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_seconds(&self) -> u64 {
        self.0 / 1000
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Formats as H:MM:SS
    pub fn as_hms(&self) -> String {
        let total_seconds = self.as_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hms())
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(d: Duration) -> Self {
        std::time::Duration::from_millis(d.0)
    }
}

/// Trait for types that can validate themselves
pub trait Validator {
    /// Validates the instance and returns every problem found
    fn validate(&self) -> Result<(), Vec<String>>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_after() {
        let t = Timestamp::from_millis(1_000);
        let later = t.after(std::time::Duration::from_secs(300));
        assert_eq!(later.as_millis(), 301_000);
        assert!(later > t);
    }

    #[test]
    fn test_millis_until_never_negative() {
        let early = Timestamp::from_millis(1_000);
        let late = Timestamp::from_millis(4_500);
        assert_eq!(early.millis_until(late), 3_500);
        assert_eq!(late.millis_until(early), 0);
    }

    #[test]
    fn test_timestamp_display() {
        let t = Timestamp::from_millis(1234567890123);
        assert_eq!(t.to_string(), "1234567890123");
    }

    #[test]
    fn test_duration_from_secs_f64() {
        assert_eq!(Duration::from_secs_f64(1.5).as_millis(), 1500);
        assert_eq!(Duration::from_secs_f64(-3.0), Duration::ZERO);
        assert_eq!(Duration::from_secs_f64(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn test_duration_as_secs_f64() {
        let d = Duration::from_millis(2_250);
        assert_eq!(d.as_secs_f64(), 2.25);
        assert_eq!(d.as_seconds(), 2);
    }

    #[test]
    fn test_duration_as_hms() {
        assert_eq!(Duration::from_seconds(3665).as_hms(), "1:01:05");
        assert_eq!(Duration::from_seconds(125).as_hms(), "0:02:05");
        assert_eq!(Duration::ZERO.to_string(), "0:00:00");
    }

    #[test]
    fn test_duration_std_conversions() {
        let d: Duration = std::time::Duration::from_secs(42).into();
        assert_eq!(d.as_seconds(), 42);

        let back: std::time::Duration = d.into();
        assert_eq!(back, std::time::Duration::from_secs(42));
    }

    #[test]
    fn test_validator_default_is_valid() {
        struct Positive(i32);

        impl Validator for Positive {
            fn validate(&self) -> Result<(), Vec<String>> {
                if self.0 < 0 {
                    Err(vec!["Value must be positive".to_string()])
                } else {
                    Ok(())
                }
            }
        }

        assert!(Positive(10).is_valid());
        assert!(!Positive(-5).is_valid());
    }
}
