//! Transport commands
//!
//! Play, pause, seek, rate and volume. Without a loaded chapter every
//! command is a no-op. Rate and volume are listener preferences and are
//! kept in state even then, to be applied to the next handle.

use crate::session::SessionCore;
use crate::silence::SilenceTrigger;
use crate::{PlaybackSession, SessionError, SessionResult};

/// What a play request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    Paused,
    /// The device is silent; a prompt went to the notifier instead
    AwaitingConfirmation,
    /// Nothing is loaded
    NoMedia,
}

/// Clamps a position into `[0, duration]`, mapping NaN to the start
pub(crate) fn clamp_position(seconds: f64, duration: f64) -> f64 {
    if seconds.is_nan() {
        return 0.0;
    }
    seconds.max(0.0).min(duration.max(0.0))
}

impl PlaybackSession {
    /// Starts playback unless the device is silent
    pub async fn play(&self) -> SessionResult<PlayOutcome> {
        let mut core = self.shared.core.lock().await;
        let result = core.play().await;
        self.shared.commit(core);
        result
    }

    pub async fn pause(&self) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.pause().await;
        self.shared.commit(core);
        result
    }

    pub async fn toggle_play_pause(&self) -> SessionResult<PlayOutcome> {
        let mut core = self.shared.core.lock().await;
        let result = core.toggle_play_pause().await;
        self.shared.commit(core);
        result
    }

    pub async fn seek_to(&self, seconds: f64) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.seek_to(seconds).await;
        self.shared.commit(core);
        result
    }

    pub async fn skip_forward(&self, seconds: f64) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.skip_by(seconds).await;
        self.shared.commit(core);
        result
    }

    pub async fn skip_backward(&self, seconds: f64) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.skip_by(-seconds).await;
        self.shared.commit(core);
        result
    }

    /// Skips forward by the configured interval
    pub async fn skip_forward_default(&self) -> SessionResult<()> {
        let seconds = self.skip_seconds().await;
        self.skip_forward(seconds).await
    }

    /// Skips backward by the configured interval
    pub async fn skip_backward_default(&self) -> SessionResult<()> {
        let seconds = self.skip_seconds().await;
        self.skip_backward(seconds).await
    }

    pub async fn set_playback_rate(&self, rate: f32) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.set_playback_rate(rate).await;
        self.shared.commit(core);
        result
    }

    /// Sets the volume, clamped into `[0, 1]`
    pub async fn set_volume(&self, volume: f32) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.set_volume(volume).await;
        self.shared.commit(core);
        result
    }

    async fn skip_seconds(&self) -> f64 {
        self.shared.core.lock().await.config.skip_seconds as f64
    }
}

impl SessionCore {
    pub(crate) async fn play(&mut self) -> SessionResult<PlayOutcome> {
        if self.engine.is_none() {
            return Ok(PlayOutcome::NoMedia);
        }

        let is_silent = self.silence_sensor.is_silent();
        if self.silence.should_confirm_before_play(is_silent) {
            log::info!("Device is silent, asking before starting playback");
            self.raise_silence_prompt(SilenceTrigger::PlayRequested);
            return Ok(PlayOutcome::AwaitingConfirmation);
        }

        self.play_unchecked().await?;
        Ok(PlayOutcome::Started)
    }

    /// Starts playback without consulting the silence sensor
    ///
    /// Used by chapter navigation and by a confirmed silence prompt.
    pub(crate) async fn play_unchecked(&mut self) -> SessionResult<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        engine.play().await.map_err(SessionError::engine("play"))?;
        self.state.is_playing = true;
        Ok(())
    }

    pub(crate) async fn pause(&mut self) -> SessionResult<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        engine.pause().await.map_err(SessionError::engine("pause"))?;
        self.state.is_playing = false;
        Ok(())
    }

    pub(crate) async fn toggle_play_pause(&mut self) -> SessionResult<PlayOutcome> {
        if self.engine.is_none() {
            return Ok(PlayOutcome::NoMedia);
        }
        if self.state.is_playing {
            self.pause().await?;
            return Ok(PlayOutcome::Paused);
        }
        self.play().await
    }

    pub(crate) async fn seek_to(&mut self, seconds: f64) -> SessionResult<()> {
        let target = clamp_position(seconds, self.state.duration);
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        engine
            .seek(target)
            .await
            .map_err(SessionError::engine("seek"))?;
        self.state.position = target;
        Ok(())
    }

    /// Seeks relative to the current position; the offset must be finite
    pub(crate) async fn skip_by(&mut self, offset: f64) -> SessionResult<()> {
        if !offset.is_finite() {
            return Err(SessionError::InvalidSkip(offset));
        }
        let target = self.state.position + offset;
        self.seek_to(target).await
    }

    pub(crate) async fn set_playback_rate(&mut self, rate: f32) -> SessionResult<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SessionError::InvalidRate(rate));
        }
        if let Some(engine) = self.engine.as_mut() {
            engine
                .set_rate(rate)
                .await
                .map_err(SessionError::engine("set_rate"))?;
        }
        self.state.playback_rate = rate;
        Ok(())
    }

    pub(crate) async fn set_volume(&mut self, volume: f32) -> SessionResult<()> {
        if volume.is_nan() {
            return Err(SessionError::InvalidVolume(volume));
        }
        let volume = volume.clamp(0.0, 1.0);
        if let Some(engine) = self.engine.as_mut() {
            engine
                .set_volume(volume)
                .await
                .map_err(SessionError::engine("set_volume"))?;
        }
        self.state.volume = volume;
        Ok(())
    }
}
