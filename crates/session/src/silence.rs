//! Silent playback detection
//!
//! Audio that plays on a muted device burns through a chapter nobody hears.
//! The guard fires once when the device goes silent during playback and is
//! consulted again before every explicit play.

use crate::session::Shared;
use crate::transport::PlayOutcome;
use crate::SessionResult;
use std::fmt;
use std::sync::{Arc, Weak};

/// What made the session ask for confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceTrigger {
    /// The device went silent while audio was playing
    WentSilent,
    /// The listener pressed play on a silent device
    PlayRequested,
}

/// Edge detector over the silence signal
#[derive(Debug, Clone, Default)]
pub struct SilentPlaybackGuard {
    previous_silent: bool,
}

impl SilentPlaybackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one sample of the silence signal
    ///
    /// Returns true on the transition from audible to silent while playing.
    pub fn observe(&mut self, is_playing: bool, is_silent: bool) -> bool {
        let went_silent = is_playing && is_silent && !self.previous_silent;
        self.previous_silent = is_silent;
        went_silent
    }

    /// Whether an explicit play must be confirmed first
    ///
    /// The sample counts as observed, so a confirmed play on a device that
    /// is already silent does not trip the edge detector on the next tick.
    pub fn should_confirm_before_play(&mut self, is_silent: bool) -> bool {
        self.previous_silent = is_silent;
        is_silent
    }
}

/// A pending "play anyway?" question for the listener
///
/// Tied to the engine handle that was current when it was raised. Once
/// that handle is retired, confirming does nothing.
pub struct SilentPlaybackPrompt {
    session: Weak<Shared>,
    generation: u64,
    trigger: SilenceTrigger,
}

impl SilentPlaybackPrompt {
    pub(crate) fn new(session: Weak<Shared>, generation: u64, trigger: SilenceTrigger) -> Self {
        Self {
            session,
            generation,
            trigger,
        }
    }

    pub fn trigger(&self) -> SilenceTrigger {
        self.trigger
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn belongs_to(&self, session: &Arc<Shared>) -> bool {
        std::ptr::eq(self.session.as_ptr(), Arc::as_ptr(session))
    }

    /// Resumes playback despite the silent device
    pub async fn confirm(self) -> SessionResult<PlayOutcome> {
        match self.session.upgrade() {
            Some(shared) => shared.resume_after_silence_prompt(self.generation).await,
            None => Ok(PlayOutcome::NoMedia),
        }
    }
}

impl fmt::Debug for SilentPlaybackPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SilentPlaybackPrompt")
            .field("generation", &self.generation)
            .field("trigger", &self.trigger)
            .finish()
    }
}
