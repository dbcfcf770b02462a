//! Playback clock for a virtual engine handle

use tokio::time::Instant;

/// Position bookkeeping for one loaded source
///
/// While playing, position is derived from the tokio clock so tests running
/// with a paused clock see deterministic progress.
#[derive(Debug, Clone)]
pub struct ClockState {
    playing: bool,
    anchor_position: f64,
    anchor_instant: Instant,
    rate: f32,
    volume: f32,
    duration: f64,
    finish_pending: bool,
}

impl ClockState {
    pub fn new(duration: f64) -> Self {
        Self {
            playing: false,
            anchor_position: 0.0,
            anchor_instant: Instant::now(),
            rate: 1.0,
            volume: 1.0,
            duration: duration.max(0.0),
            finish_pending: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn position(&self) -> f64 {
        if !self.playing {
            return self.anchor_position;
        }
        let elapsed = self.anchor_instant.elapsed().as_secs_f64() * self.rate as f64;
        (self.anchor_position + elapsed).min(self.duration)
    }

    /// Wall time left until the end at the current rate
    pub fn remaining(&self) -> std::time::Duration {
        let left = (self.duration - self.position()).max(0.0) / self.rate as f64;
        std::time::Duration::from_secs_f64(left)
    }

    pub fn play(&mut self) {
        if self.playing {
            return;
        }
        if self.anchor_position >= self.duration {
            self.anchor_position = 0.0;
        }
        self.anchor_instant = Instant::now();
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.rebase();
        self.playing = false;
    }

    pub fn seek(&mut self, position: f64) {
        self.anchor_position = position.clamp(0.0, self.duration);
        self.anchor_instant = Instant::now();
        self.finish_pending = false;
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rebase();
        self.rate = rate;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Stops the clock at the end of the source if it got there
    ///
    /// Returns true once per completed run.
    pub fn take_finished(&mut self) -> bool {
        if self.playing && self.position() >= self.duration {
            self.anchor_position = self.duration;
            self.playing = false;
            self.finish_pending = true;
        }
        std::mem::take(&mut self.finish_pending)
    }

    fn rebase(&mut self) {
        self.anchor_position = self.position();
        self.anchor_instant = Instant::now();
    }
}
