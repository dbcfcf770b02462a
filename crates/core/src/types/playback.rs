//! Playback-related domain models

use crate::types::{Book, Chapter, Timestamp, Validator};
use std::sync::Arc;

/// Sleep timer as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SleepTimerState {
    pub is_active: bool,
    /// Wall-clock moment the timer fires
    pub end_time: Option<Timestamp>,
}

impl SleepTimerState {
    pub fn armed(end_time: Timestamp) -> Self {
        Self {
            is_active: true,
            end_time: Some(end_time),
        }
    }

    pub fn clear(&mut self) {
        self.is_active = false;
        self.end_time = None;
    }
}

/// Coarse phase of the session, derived from [`PlaybackState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Playing,
    Paused,
}

/// Snapshot of everything the player screen renders
///
/// `current_book` is shared with the catalog and never mutated here.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_book: Option<Arc<Book>>,
    pub current_chapter_index: usize,
    pub is_playing: bool,
    /// Seconds into the current chapter
    pub position: f64,
    /// Seconds, as last reported for the current chapter
    pub duration: f64,
    pub playback_rate: f32,
    /// Linear gain in `[0, 1]`
    pub volume: f32,
    pub sleep_timer: SleepTimerState,
}

impl PlaybackState {
    /// Creates the idle state a session starts in
    pub fn idle() -> Self {
        Self {
            current_book: None,
            current_chapter_index: 0,
            is_playing: false,
            position: 0.0,
            duration: 0.0,
            playback_rate: 1.0,
            volume: 1.0,
            sleep_timer: SleepTimerState::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_book.is_none()
    }

    pub fn phase(&self) -> PlaybackPhase {
        if self.is_idle() {
            PlaybackPhase::Idle
        } else if self.is_playing {
            PlaybackPhase::Playing
        } else {
            PlaybackPhase::Paused
        }
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.current_book
            .as_ref()
            .and_then(|book| book.chapter(self.current_chapter_index))
    }

    pub fn progress_percentage(&self) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        ((self.position / self.duration) * 100.0) as f32
    }

    /// Drops the book while keeping the listener's rate and volume
    pub fn reset_to_idle(&mut self) {
        *self = Self {
            playback_rate: self.playback_rate,
            volume: self.volume,
            ..Self::idle()
        };
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::idle()
    }
}

impl Validator for PlaybackState {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(book) = &self.current_book {
            if self.current_chapter_index >= book.chapter_count() {
                errors.push(format!(
                    "Chapter index {} out of range for {} chapters",
                    self.current_chapter_index,
                    book.chapter_count()
                ));
            }
        }

        if self.duration < 0.0 {
            errors.push("Duration cannot be negative".to_string());
        }

        if self.position < 0.0 || self.position > self.duration.max(0.0) {
            errors.push("Position must be between 0 and duration".to_string());
        }

        if !(self.playback_rate > 0.0) {
            errors.push("Playback rate must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            errors.push("Volume must be between 0 and 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Duration;

    fn two_chapter_book() -> Arc<Book> {
        Arc::new(Book::new(
            "Test",
            vec![
                Chapter::new("One", "one.mp3", Duration::from_seconds(60)),
                Chapter::new("Two", "two.mp3", Duration::from_seconds(90)),
            ],
        ))
    }

    #[test]
    fn test_idle_state() {
        let state = PlaybackState::idle();
        assert!(state.is_idle());
        assert_eq!(state.phase(), PlaybackPhase::Idle);
        assert!(state.current_chapter().is_none());
        assert!(state.is_valid());
    }

    #[test]
    fn test_phase_follows_playing_flag() {
        let mut state = PlaybackState::idle();
        state.current_book = Some(two_chapter_book());
        assert_eq!(state.phase(), PlaybackPhase::Paused);
        state.is_playing = true;
        assert_eq!(state.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_current_chapter() {
        let mut state = PlaybackState::idle();
        state.current_book = Some(two_chapter_book());
        state.current_chapter_index = 1;
        assert_eq!(state.current_chapter().map(|c| c.title.as_str()), Some("Two"));
    }

    #[test]
    fn test_reset_to_idle_keeps_preferences() {
        let mut state = PlaybackState::idle();
        state.current_book = Some(two_chapter_book());
        state.current_chapter_index = 1;
        state.playback_rate = 1.5;
        state.volume = 0.4;
        state.position = 12.0;
        state.duration = 90.0;

        state.reset_to_idle();

        assert!(state.is_idle());
        assert_eq!(state.current_chapter_index, 0);
        assert_eq!(state.position, 0.0);
        assert_eq!(state.playback_rate, 1.5);
        assert_eq!(state.volume, 0.4);
    }

    #[test]
    fn test_progress_percentage() {
        let mut state = PlaybackState::idle();
        assert_eq!(state.progress_percentage(), 0.0);
        state.duration = 200.0;
        state.position = 50.0;
        assert_eq!(state.progress_percentage(), 25.0);
    }

    #[test]
    fn test_validation_catches_out_of_range_index() {
        let mut state = PlaybackState::idle();
        state.current_book = Some(two_chapter_book());
        state.current_chapter_index = 2;
        assert!(!state.is_valid());
    }

    #[test]
    fn test_validation_catches_bad_rate_and_volume() {
        let mut state = PlaybackState::idle();
        state.playback_rate = 0.0;
        state.volume = 1.2;
        let errors = state.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_sleep_timer_state_clear() {
        let mut timer = SleepTimerState::armed(Timestamp::from_millis(5_000));
        assert!(timer.is_active);
        timer.clear();
        assert_eq!(timer, SleepTimerState::default());
    }
}
